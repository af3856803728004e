use std::fmt;

use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::{ConversationHandle, Credentials, Dialog, Message, QrChallenge};

/// Lazy, finite, oldest-first message history. Not restartable.
pub type MessageStream<'a> = BoxStream<'a, Result<Message, PlatformError>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::RateLimited, message)
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::ConnectionLost, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// Credentials or session rejected.
    Unauthorized,
    /// Flood control; the message text carries the mandatory wait.
    RateLimited,
    /// Login challenge no longer valid.
    Expired,
    ConnectionLost,
    /// One request took too long; the connection itself may be fine.
    Timeout,
    NotFound,
    /// Bridge answered with something we could not understand.
    Protocol,
    Other,
}

impl fmt::Display for PlatformErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformErrorKind::Unauthorized => write!(f, "unauthorized"),
            PlatformErrorKind::RateLimited => write!(f, "rate limited"),
            PlatformErrorKind::Expired => write!(f, "expired"),
            PlatformErrorKind::ConnectionLost => write!(f, "connection lost"),
            PlatformErrorKind::Timeout => write!(f, "timed out"),
            PlatformErrorKind::NotFound => write!(f, "not found"),
            PlatformErrorKind::Protocol => write!(f, "protocol error"),
            PlatformErrorKind::Other => write!(f, "platform error"),
        }
    }
}

/// Opens connections to the messaging platform.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials)
        -> Result<Box<dyn Connection>, PlatformError>;
}

/// One live, exclusively owned platform session.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    async fn is_connected(&self) -> bool;

    async fn reconnect(&self) -> Result<(), PlatformError>;

    async fn is_authorized(&self) -> Result<bool, PlatformError>;

    async fn begin_qr_login(&self) -> Result<QrChallenge, PlatformError>;

    /// Resolves once the challenge is confirmed on another device.
    async fn wait_qr_login(&self, challenge: &QrChallenge) -> Result<(), PlatformError>;

    async fn list_dialogs(&self) -> Result<Vec<Dialog>, PlatformError>;

    fn messages_oldest_first<'a>(&'a self, conversation: &ConversationHandle) -> MessageStream<'a>;

    async fn forward_message(
        &self,
        source: &ConversationHandle,
        destination: &ConversationHandle,
        message_id: i64,
    ) -> Result<(), PlatformError>;

    /// Portable session string the user may keep for a later manual login.
    async fn export_session(&self) -> Option<String>;

    async fn disconnect(&self);
}
