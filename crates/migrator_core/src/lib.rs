//! Migrator core: pure state machine and view-model helpers.
mod activity;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use activity::ActivityLog;
pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    summary_text, AppSecret, AppState, AuthFailure, Challenge, ConversationEntry, ConversationId,
    MigrationSummary, Phase,
};
pub use update::update;
pub use view_model::{AppViewModel, ChallengeView, ConversationOption};
