use serde::Serialize;

use crate::{ConversationId, Phase};

/// Everything the control surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AppViewModel {
    pub phase: Phase,
    pub show_login: bool,
    pub login_enabled: bool,
    pub challenge: Option<ChallengeView>,
    pub conversations: Vec<ConversationOption>,
    pub migrate_enabled: bool,
    pub cancel_enabled: bool,
    pub reload_enabled: bool,
    pub sign_out_enabled: bool,
    /// Background work is in flight; the surface should refresh on its own.
    pub busy: bool,
    pub status: Option<String>,
    pub forwarded: u64,
    pub failed: u64,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub session_token: Option<String>,
    pub activity: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeView {
    pub url: String,
    pub image: Option<String>,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationOption {
    pub id: ConversationId,
    pub label: String,
    pub is_source: bool,
    pub is_destination: bool,
}
