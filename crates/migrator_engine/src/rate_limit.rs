use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::{MigrateSettings, PlatformError};

/// Extracts the mandatory wait, in seconds, from a rate-limit error text.
pub trait WaitParser: Send + Sync {
    fn wait_seconds(&self, text: &str) -> Option<u64>;
}

/// Takes the first run of digits in the text.
///
/// Platforms phrase flood waits as "A wait of 12 seconds is required" or
/// "FLOOD_WAIT_12"; both put the duration first. A message that mentions some
/// other number before the duration will be misread.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstIntegerParser;

static FIRST_INTEGER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[0-9]+").ok());

impl WaitParser for FirstIntegerParser {
    fn wait_seconds(&self, text: &str) -> Option<u64> {
        FIRST_INTEGER.as_ref()?.find(text)?.as_str().parse().ok()
    }
}

/// Decides how long to pause before the single retry of a rate-limited forward.
pub struct RetryPolicy {
    parser: Box<dyn WaitParser>,
    fallback: Duration,
}

impl RetryPolicy {
    pub fn new(parser: Box<dyn WaitParser>, fallback: Duration) -> Self {
        Self { parser, fallback }
    }

    pub fn from_settings(settings: &MigrateSettings) -> Self {
        Self::new(
            Box::new(FirstIntegerParser),
            Duration::from_secs(settings.fallback_wait_secs),
        )
    }

    pub fn wait_for(&self, error: &PlatformError) -> Duration {
        self.parser
            .wait_seconds(&error.message)
            .map(Duration::from_secs)
            .unwrap_or(self.fallback)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&MigrateSettings::default())
    }
}

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
