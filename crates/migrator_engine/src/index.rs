use std::collections::HashSet;

use migrator_logging::{migrator_debug, migrator_info};
use thiserror::Error;

use crate::{Connection, ConversationHandle, ConversationKind, IndexSettings, LabelStyle, PlatformError};

/// Placeholder for conversations whose display name is blank.
pub const UNNAMED: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("conversation listing failed: {0}")]
    Failed(PlatformError),
    #[error("no authorized connection")]
    NotConnected,
}

/// Selection label: `"{icon} {name} (ID: {id})"`, never empty and unique per id.
pub fn conversation_label(style: LabelStyle, kind: ConversationKind, name: &str, id: i64) -> String {
    let name = match name.trim() {
        "" => UNNAMED,
        trimmed => trimmed,
    };
    match style {
        LabelStyle::Icons => format!("{} {name} (ID: {id})", kind.icon()),
        LabelStyle::Plain => format!("{name} (ID: {id})"),
    }
}

/// Lists every direct chat, group and channel, in platform order.
pub async fn index_conversations(
    connection: &dyn Connection,
    settings: &IndexSettings,
) -> Result<Vec<ConversationHandle>, IndexError> {
    let dialogs = connection.list_dialogs().await.map_err(IndexError::Failed)?;
    let total = dialogs.len();

    let mut seen = HashSet::with_capacity(total);
    let mut handles = Vec::with_capacity(total);
    for dialog in dialogs {
        let Some(kind) = ConversationKind::from_dialog(dialog.kind) else {
            continue;
        };
        if !seen.insert(dialog.id) {
            migrator_debug!("dropping repeated dialog id {}", dialog.id);
            continue;
        }
        let label = conversation_label(settings.label_style, kind, &dialog.name, dialog.id);
        handles.push(ConversationHandle {
            id: dialog.id,
            kind,
            name: dialog.name.trim().to_string(),
            peer: dialog.peer,
            label,
        });
    }

    migrator_info!("indexed {} of {} dialogs", handles.len(), total);
    Ok(handles)
}
