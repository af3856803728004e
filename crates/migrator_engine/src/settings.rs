use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::QrFormat;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub bridge: BridgeSettings,
    pub auth: AuthSettings,
    pub index: IndexSettings,
    pub migrate: MigrateSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Messages requested per history page.
    pub page_size: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8765/".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            page_size: 100,
        }
    }
}

impl BridgeSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Upper bound on how long a QR challenge is waited for.
    pub challenge_validity_secs: u64,
    pub qr_format: QrFormat,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            challenge_validity_secs: 30,
            qr_format: QrFormat::Svg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelStyle {
    /// `"👥 Family (ID: 20)"`
    #[default]
    Icons,
    /// `"Family (ID: 20)"`
    Plain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub label_style: LabelStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateSettings {
    /// Emit a progress update every N forwarded messages.
    pub progress_every: u64,
    /// Wait used when a rate-limit message carries no readable duration.
    pub fallback_wait_secs: u64,
}

impl Default for MigrateSettings {
    fn default() -> Self {
        Self {
            progress_every: 5,
            fallback_wait_secs: 10,
        }
    }
}
