use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AuthError, IndexError};

/// Application credentials issued by the messaging platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: i32,
    app_secret: String,
}

impl Credentials {
    /// Validates locally what the platform would reject anyway.
    pub fn new(app_id: i32, app_secret: impl Into<String>) -> Result<Self, AuthError> {
        let app_secret = app_secret.into();
        if app_id <= 0 {
            return Err(AuthError::InvalidCredentials(
                "application id must be a positive number".to_string(),
            ));
        }
        if app_secret.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(
                "application secret is empty".to_string(),
            ));
        }
        Ok(Self { app_id, app_secret })
    }

    pub fn app_id(&self) -> i32 {
        self.app_id
    }

    pub fn app_secret(&self) -> &str {
        &self.app_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &migrator_logging::redact(&self.app_secret))
            .finish()
    }
}

/// Dialog kind as reported by the platform. Unknown kinds are kept so they
/// can be filtered out instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    User,
    Group,
    Channel,
    #[serde(other)]
    Other,
}

/// Raw conversation record from the platform enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: i64,
    pub kind: DialogKind,
    #[serde(default)]
    pub name: String,
    /// Opaque platform reference used to address the conversation.
    pub peer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversationKind {
    Direct,
    Group,
    Channel,
}

impl ConversationKind {
    pub fn from_dialog(kind: DialogKind) -> Option<Self> {
        match kind {
            DialogKind::User => Some(Self::Direct),
            DialogKind::Group => Some(Self::Group),
            DialogKind::Channel => Some(Self::Channel),
            DialogKind::Other => None,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Direct => "👤",
            Self::Group => "👥",
            Self::Channel => "📢",
        }
    }
}

/// Indexed conversation, read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationHandle {
    pub id: i64,
    pub kind: ConversationKind,
    pub name: String,
    pub peer: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    /// Link preview card; no attached file.
    WebPage,
    Document,
    Audio,
    Sticker,
    Poll,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Join/pin/title-change style system entry.
    #[serde(default)]
    pub service: bool,
    #[serde(default)]
    pub media: Option<MediaKind>,
}

/// In-progress QR login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QrChallenge {
    pub token: String,
    pub url: String,
    #[serde(rename = "expires_in")]
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationReport {
    pub examined: u64,
    pub eligible: u64,
    pub forwarded: u64,
    pub failed: u64,
    pub aborted: Option<String>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ChallengeIssued {
        url: String,
        image: Option<String>,
        expires_in_secs: u64,
    },
    Authorized {
        resumed: bool,
        session_token: Option<String>,
    },
    AuthFailed(AuthError),
    ConversationsIndexed(Vec<ConversationHandle>),
    IndexingFailed(IndexError),
    MigrationProgress {
        forwarded: u64,
    },
    RateLimited {
        message_id: i64,
        seconds: u64,
    },
    MessageFailed {
        message_id: i64,
        reason: String,
    },
    MigrationFinished(MigrationReport),
    Notice(String),
}
