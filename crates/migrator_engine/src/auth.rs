use std::fmt;
use std::time::Duration;

use migrator_logging::{migrator_info, migrator_warn};
use thiserror::Error;

use crate::{
    render_qr_data_url, AuthSettings, Connection, Connector, Credentials, EngineEvent,
    PlatformError, PlatformErrorKind, ProgressSink, QrChallenge,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected by local validation or by the platform; not retried.
    #[error("credentials rejected: {0}")]
    InvalidCredentials(String),
    /// The QR challenge was not confirmed in time or failed while waiting.
    #[error("login challenge expired: {0}")]
    ChallengeExpired(String),
    #[error("cannot reach platform: {0}")]
    Connection(PlatformError),
}

/// An authorized connection, ready for indexing and migration.
pub struct Authorized {
    pub connection: Box<dyn Connection>,
    /// True when the platform already considered the session authorized.
    pub resumed: bool,
    pub session_token: Option<String>,
}

impl fmt::Debug for Authorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorized")
            .field("resumed", &self.resumed)
            .field("session_token", &self.session_token.as_deref().map(migrator_logging::redact))
            .finish_non_exhaustive()
    }
}

/// Connects and, unless the session is already authorized, runs one QR login
/// challenge to completion.
///
/// Emits [`EngineEvent::ChallengeIssued`] once the challenge URL is known so the
/// control surface can show it while this call keeps waiting.
pub async fn authenticate(
    connector: &dyn Connector,
    credentials: &Credentials,
    settings: &AuthSettings,
    sink: &dyn ProgressSink,
) -> Result<Authorized, AuthError> {
    let connection = connector
        .connect(credentials)
        .await
        .map_err(rejected_or_unreachable)?;

    // Every failure past this point leaves an open connection behind.
    let resumed = match log_in(connection.as_ref(), settings, sink).await {
        Ok(resumed) => resumed,
        Err(err) => {
            migrator_warn!("sign-in for app {} failed: {}", credentials.app_id(), err);
            connection.disconnect().await;
            return Err(err);
        }
    };

    if resumed {
        migrator_info!("session for app {} already authorized", credentials.app_id());
    } else {
        migrator_info!("QR login confirmed for app {}", credentials.app_id());
    }
    let session_token = connection.export_session().await;
    Ok(Authorized {
        connection,
        resumed,
        session_token,
    })
}

/// Returns whether the session was already authorized before any challenge.
async fn log_in(
    connection: &dyn Connection,
    settings: &AuthSettings,
    sink: &dyn ProgressSink,
) -> Result<bool, AuthError> {
    if connection
        .is_authorized()
        .await
        .map_err(rejected_or_unreachable)?
    {
        return Ok(true);
    }

    let challenge = connection
        .begin_qr_login()
        .await
        .map_err(rejected_or_unreachable)?;
    let window = challenge_window(challenge.expires_in_secs, settings);

    let image = match render_qr_data_url(&challenge.url, settings.qr_format) {
        Ok(image) => Some(image),
        Err(err) => {
            migrator_warn!("QR rendering failed, showing the raw url instead: {}", err);
            None
        }
    };
    sink.emit(EngineEvent::ChallengeIssued {
        url: challenge.url.clone(),
        image,
        expires_in_secs: window.as_secs(),
    });
    migrator_info!("QR challenge issued, waiting up to {}s", window.as_secs());

    confirm(connection, &challenge, window).await?;
    Ok(false)
}

fn rejected_or_unreachable(err: PlatformError) -> AuthError {
    match err.kind {
        PlatformErrorKind::Unauthorized => AuthError::InvalidCredentials(err.message),
        _ => AuthError::Connection(err),
    }
}

async fn confirm(
    connection: &dyn Connection,
    challenge: &QrChallenge,
    window: Duration,
) -> Result<(), AuthError> {
    match tokio::time::timeout(window, connection.wait_qr_login(challenge)).await {
        Err(_) => {
            return Err(AuthError::ChallengeExpired(format!(
                "not confirmed within {}s",
                window.as_secs()
            )));
        }
        Ok(Err(err)) => return Err(AuthError::ChallengeExpired(err.message)),
        Ok(Ok(())) => {}
    }

    match connection.is_authorized().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::ChallengeExpired(
            "platform did not authorize the session".to_string(),
        )),
        Err(err) => Err(AuthError::ChallengeExpired(err.message)),
    }
}

fn challenge_window(platform_secs: u64, settings: &AuthSettings) -> Duration {
    let secs = match platform_secs {
        0 => settings.challenge_validity_secs,
        reported => reported.min(settings.challenge_validity_secs),
    };
    Duration::from_secs(secs.max(1))
}
