use crate::{AppSecret, AuthFailure, ConversationEntry, ConversationId, MigrationSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted the login form. Values are raw form text.
    CredentialsSubmitted {
        app_id: String,
        app_secret: AppSecret,
    },
    /// Engine obtained a QR login challenge.
    ChallengeIssued {
        url: String,
        image: Option<String>,
        expires_in_secs: u64,
    },
    /// Engine holds an authorized connection.
    Authorized {
        resumed: bool,
        session_token: Option<String>,
    },
    /// Authentication attempt ended without a connection.
    AuthFailed { failure: AuthFailure, detail: String },
    /// Engine finished enumerating conversations, in platform order.
    ConversationsIndexed(Vec<ConversationEntry>),
    /// Engine could not enumerate conversations.
    IndexingFailed { detail: String },
    /// User asked for the conversation list to be loaded again.
    ReloadClicked,
    /// User clicked the migrate button with the current selection.
    MigrateClicked {
        source: ConversationId,
        destination: ConversationId,
    },
    /// User asked to stop the running migration.
    CancelClicked,
    /// User wants to drop the connection and start over.
    SignOutClicked,
    /// Running count of forwarded messages.
    MigrationProgress { forwarded: u64 },
    /// Platform imposed a pause before the next forward attempt.
    RateLimited { message_id: i64, seconds: u64 },
    /// A single message could not be forwarded and was skipped.
    MessageFailed { message_id: i64, reason: String },
    /// Migration run ended (completed, aborted or cancelled).
    MigrationFinished(MigrationSummary),
    /// Free-form engine notice for the activity log.
    Notice(String),
}
