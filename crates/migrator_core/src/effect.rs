use crate::{AppSecret, ConversationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Authenticate {
        app_id: i32,
        app_secret: AppSecret,
    },
    IndexConversations,
    Migrate {
        source: ConversationId,
        destination: ConversationId,
    },
    CancelMigration,
    Disconnect,
}
