use crate::{AppSecret, AppState, AuthFailure, Challenge, Effect, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::CredentialsSubmitted { app_id, app_secret } => {
            if state.phase() != Phase::Unauthenticated {
                return (state, Vec::new());
            }
            match validate_credentials(&app_id, &app_secret) {
                Ok(app_id) => {
                    state.clear_error();
                    state.begin_authentication();
                    state.log(format!("Connecting with application id {app_id}."));
                    vec![Effect::Authenticate { app_id, app_secret }]
                }
                Err(problem) => {
                    state.set_error(problem);
                    Vec::new()
                }
            }
        }
        Msg::ChallengeIssued {
            url,
            image,
            expires_in_secs,
        } => {
            if state.phase() == Phase::AwaitingChallenge {
                state.log(format!(
                    "Login challenge issued; it expires in {expires_in_secs} seconds."
                ));
                state.set_challenge(Challenge {
                    url,
                    image,
                    expires_in_secs,
                });
            }
            Vec::new()
        }
        Msg::Authorized {
            resumed,
            session_token,
        } => {
            if state.phase() != Phase::AwaitingChallenge {
                return (state, Vec::new());
            }
            if resumed {
                state.log("Existing authorization found; QR login skipped.");
            } else {
                state.log("QR login confirmed. Connected.");
            }
            state.authorize(session_token);
            vec![Effect::IndexConversations]
        }
        Msg::AuthFailed { failure, detail } => {
            if state.phase() == Phase::AwaitingChallenge {
                state.reset_to_login();
                state.set_error(auth_failure_text(failure, &detail));
            }
            Vec::new()
        }
        Msg::ConversationsIndexed(entries) => {
            if state.phase() != Phase::Authenticated {
                return (state, Vec::new());
            }
            state.log(format!("Loaded {} conversations.", entries.len()));
            state.set_conversations(entries);
            Vec::new()
        }
        Msg::IndexingFailed { detail } => {
            if state.phase() == Phase::Authenticated {
                state.indexing_failed();
                state.set_error(format!(
                    "Could not load conversations ({detail}). Reload to try again."
                ));
            }
            Vec::new()
        }
        Msg::ReloadClicked => {
            let can_reload = matches!(state.phase(), Phase::Indexed | Phase::Done)
                || (state.phase() == Phase::Authenticated && state.error().is_some());
            if !can_reload {
                return (state, Vec::new());
            }
            state.clear_error();
            state.begin_indexing();
            state.log("Reloading conversations.");
            vec![Effect::IndexConversations]
        }
        Msg::MigrateClicked {
            source,
            destination,
        } => {
            // A run in flight (or no conversation list yet) blocks new starts.
            if !matches!(state.phase(), Phase::Indexed | Phase::Done) {
                return (state, Vec::new());
            }
            if source == destination {
                state.set_error("Source and destination cannot be the same conversation.");
                return (state, Vec::new());
            }
            let labels = (
                state.label_of(source).map(ToOwned::to_owned),
                state.label_of(destination).map(ToOwned::to_owned),
            );
            let (Some(source_label), Some(destination_label)) = labels else {
                state.set_error("Unknown conversation selected. Reload the list and try again.");
                return (state, Vec::new());
            };
            state.clear_error();
            state.start_migration(source, destination);
            state.log(format!(
                "Migrating media from {source_label} to {destination_label}."
            ));
            vec![Effect::Migrate {
                source,
                destination,
            }]
        }
        Msg::CancelClicked => {
            if state.phase() == Phase::Migrating && !state.is_cancel_requested() {
                state.request_cancel();
                state.log("Cancellation requested.");
                vec![Effect::CancelMigration]
            } else {
                Vec::new()
            }
        }
        Msg::SignOutClicked => {
            if state.phase().is_authorized() && state.phase() != Phase::Migrating {
                state.sign_out();
                state.log("Signed out.");
                vec![Effect::Disconnect]
            } else {
                Vec::new()
            }
        }
        Msg::MigrationProgress { forwarded } => {
            if state.phase() == Phase::Migrating {
                state.set_progress(forwarded);
            }
            Vec::new()
        }
        Msg::RateLimited {
            message_id,
            seconds,
        } => {
            if state.phase() == Phase::Migrating {
                state.set_status(format!("Platform requested a pause of {seconds}s..."));
                state.log(format!(
                    "Rate limited; waiting {seconds}s before retrying message {message_id}."
                ));
            }
            Vec::new()
        }
        Msg::MessageFailed { message_id, reason } => {
            if state.phase() == Phase::Migrating {
                state.record_failure();
                state.log(format!("Message {message_id} not forwarded: {reason}"));
            }
            Vec::new()
        }
        Msg::MigrationFinished(summary) => {
            if state.phase() != Phase::Migrating {
                return (state, Vec::new());
            }
            state.finish_migration(&summary);
            if summary.failed > 0 {
                state.log(format!(
                    "{} of {} eligible messages could not be forwarded.",
                    summary.failed, summary.eligible
                ));
            }
            let text = crate::summary_text(&summary);
            state.log(text);
            Vec::new()
        }
        Msg::Notice(line) => {
            state.log(line);
            Vec::new()
        }
    };

    (state, effects)
}

fn validate_credentials(app_id: &str, app_secret: &AppSecret) -> Result<i32, &'static str> {
    let app_id = app_id.trim();
    if app_id.is_empty() || app_secret.expose().trim().is_empty() {
        return Err("Missing credentials.");
    }
    match app_id.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err("Application id must be a positive number."),
    }
}

fn auth_failure_text(failure: AuthFailure, detail: &str) -> String {
    match failure {
        AuthFailure::InvalidCredentials => format!("Credentials rejected: {detail}"),
        AuthFailure::ChallengeExpired => {
            format!("The QR code expired or login failed ({detail}). Start again.")
        }
        AuthFailure::Connection => format!("Could not connect: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_credentials;
    use crate::AppSecret;

    #[test]
    fn credentials_require_positive_numeric_id() {
        let secret = AppSecret::new("abc");
        assert_eq!(validate_credentials(" 42 ", &secret), Ok(42));
        assert!(validate_credentials("0", &secret).is_err());
        assert!(validate_credentials("-3", &secret).is_err());
        assert!(validate_credentials("abc", &secret).is_err());
    }

    #[test]
    fn blank_secret_is_missing() {
        assert_eq!(
            validate_credentials("42", &AppSecret::new("   ")),
            Err("Missing credentials.")
        );
    }
}
