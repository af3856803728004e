use migrator_core::{AuthFailure, ConversationEntry, Effect, MigrationSummary, Msg};
use migrator_engine::{
    AuthError, ConversationHandle, Credentials, EngineEvent, EngineHandle, IndexError,
    MigrationReport,
};
use migrator_logging::{migrator_debug, migrator_info};

/// Executes core effects against one session's engine worker.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Hands effects to the engine. Returns messages that can be answered
    /// without it, to be fed back into `update`.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut feedback = Vec::new();
        for effect in effects {
            match effect {
                Effect::Authenticate { app_id, app_secret } => {
                    match Credentials::new(app_id, app_secret.expose()) {
                        Ok(credentials) => {
                            migrator_info!("Authenticate app_id={}", app_id);
                            self.engine.authenticate(credentials);
                        }
                        Err(err) => feedback.push(auth_failed(&err)),
                    }
                }
                Effect::IndexConversations => self.engine.index(),
                Effect::Migrate {
                    source,
                    destination,
                } => {
                    migrator_info!("Migrate source={} destination={}", source, destination);
                    self.engine.migrate(source, destination);
                }
                Effect::CancelMigration => self.engine.cancel_migration(),
                Effect::Disconnect => self.engine.disconnect(),
            }
        }
        feedback
    }

    pub fn cancel_running(&self) {
        self.engine.cancel_migration();
    }
}

pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ChallengeIssued {
            url,
            image,
            expires_in_secs,
        } => Msg::ChallengeIssued {
            url,
            image,
            expires_in_secs,
        },
        EngineEvent::Authorized {
            resumed,
            session_token,
        } => Msg::Authorized {
            resumed,
            session_token,
        },
        EngineEvent::AuthFailed(err) => auth_failed(&err),
        EngineEvent::ConversationsIndexed(handles) => {
            Msg::ConversationsIndexed(handles.into_iter().map(entry_from).collect())
        }
        EngineEvent::IndexingFailed(err) => Msg::IndexingFailed {
            detail: match &err {
                IndexError::Failed(platform) => platform.to_string(),
                IndexError::NotConnected => err.to_string(),
            },
        },
        EngineEvent::MigrationProgress { forwarded } => Msg::MigrationProgress { forwarded },
        EngineEvent::RateLimited {
            message_id,
            seconds,
        } => Msg::RateLimited {
            message_id,
            seconds,
        },
        EngineEvent::MessageFailed { message_id, reason } => {
            Msg::MessageFailed { message_id, reason }
        }
        EngineEvent::MigrationFinished(report) => {
            migrator_debug!("migration report {:?}", report);
            Msg::MigrationFinished(summary_from(report))
        }
        EngineEvent::Notice(line) => Msg::Notice(line),
    }
}

fn auth_failed(err: &AuthError) -> Msg {
    let (failure, detail) = match err {
        AuthError::InvalidCredentials(detail) => (AuthFailure::InvalidCredentials, detail.clone()),
        AuthError::ChallengeExpired(detail) => (AuthFailure::ChallengeExpired, detail.clone()),
        AuthError::Connection(platform) => (AuthFailure::Connection, platform.to_string()),
    };
    Msg::AuthFailed { failure, detail }
}

fn entry_from(handle: ConversationHandle) -> ConversationEntry {
    ConversationEntry {
        id: handle.id,
        label: handle.label,
    }
}

fn summary_from(report: MigrationReport) -> MigrationSummary {
    MigrationSummary {
        examined: report.examined,
        eligible: report.eligible,
        forwarded: report.forwarded,
        failed: report.failed,
        aborted: report.aborted,
        cancelled: report.cancelled,
    }
}

#[cfg(test)]
mod tests {
    use migrator_core::{AuthFailure, ConversationEntry, MigrationSummary, Msg};
    use migrator_engine::{
        AuthError, ConversationHandle, ConversationKind, EngineEvent, IndexError,
        MigrationReport, PlatformError,
    };
    use pretty_assertions::assert_eq;

    use super::event_to_msg;

    #[test]
    fn auth_errors_keep_their_category() {
        assert_eq!(
            event_to_msg(EngineEvent::AuthFailed(AuthError::InvalidCredentials(
                "API_ID_INVALID".to_string()
            ))),
            Msg::AuthFailed {
                failure: AuthFailure::InvalidCredentials,
                detail: "API_ID_INVALID".to_string(),
            }
        );
        assert_eq!(
            event_to_msg(EngineEvent::AuthFailed(AuthError::Connection(
                PlatformError::connection_lost("refused")
            ))),
            Msg::AuthFailed {
                failure: AuthFailure::Connection,
                detail: "connection lost: refused".to_string(),
            }
        );
    }

    #[test]
    fn indexed_handles_become_labelled_entries() {
        let handle = ConversationHandle {
            id: -100,
            kind: ConversationKind::Channel,
            name: "News".to_string(),
            peer: "c100".to_string(),
            label: "📢 News (ID: -100)".to_string(),
        };
        assert_eq!(
            event_to_msg(EngineEvent::ConversationsIndexed(vec![handle])),
            Msg::ConversationsIndexed(vec![ConversationEntry {
                id: -100,
                label: "📢 News (ID: -100)".to_string(),
            }])
        );
        assert_eq!(
            event_to_msg(EngineEvent::IndexingFailed(IndexError::NotConnected)),
            Msg::IndexingFailed {
                detail: "no authorized connection".to_string(),
            }
        );
    }

    #[test]
    fn report_maps_field_for_field() {
        let report = MigrationReport {
            examined: 6,
            eligible: 3,
            forwarded: 2,
            failed: 1,
            aborted: None,
            cancelled: true,
        };
        assert_eq!(
            event_to_msg(EngineEvent::MigrationFinished(report)),
            Msg::MigrationFinished(MigrationSummary {
                examined: 6,
                eligible: 3,
                forwarded: 2,
                failed: 1,
                aborted: None,
                cancelled: true,
            })
        );
    }
}
