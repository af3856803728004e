//! Migrator engine: platform IO, authentication, indexing and media migration.
mod auth;
mod engine;
mod http;
mod index;
mod migrate;
mod platform;
mod qr;
mod rate_limit;
mod settings;
mod sink;
mod types;

pub use auth::{authenticate, AuthError, Authorized};
pub use engine::EngineHandle;
pub use http::{error_from_status, HttpConnection, HttpConnector};
pub use index::{conversation_label, index_conversations, IndexError, UNNAMED};
pub use migrate::{classify, Eligibility, Migrator};
pub use platform::{Connection, Connector, MessageStream, PlatformError, PlatformErrorKind};
pub use qr::{render_qr_data_url, QrError, QrFormat};
pub use rate_limit::{FirstIntegerParser, RetryPolicy, Sleeper, TokioSleeper, WaitParser};
pub use settings::{
    AuthSettings, BridgeSettings, EngineSettings, IndexSettings, LabelStyle, MigrateSettings,
};
pub use sink::{ChannelProgressSink, ProgressSink};
pub use types::{
    ConversationHandle, ConversationKind, Credentials, Dialog, DialogKind, EngineEvent, MediaKind,
    Message, MigrationReport, QrChallenge,
};
