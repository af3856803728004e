use futures_util::StreamExt;
use migrator_logging::{migrator_debug, migrator_info, migrator_warn};
use tokio_util::sync::CancellationToken;

use crate::{
    Connection, ConversationHandle, EngineEvent, MediaKind, Message, MigrationReport,
    PlatformError, PlatformErrorKind, ProgressSink, RetryPolicy, Sleeper,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Service,
    /// Only a link preview card, nothing attached.
    LinkPreview,
    /// Text, documents, audio, stickers, polls.
    NotMedia,
}

pub fn classify(message: &Message) -> Eligibility {
    if message.service {
        return Eligibility::Service;
    }
    match message.media {
        Some(MediaKind::WebPage) => Eligibility::LinkPreview,
        Some(MediaKind::Photo | MediaKind::Video) => Eligibility::Eligible,
        _ => Eligibility::NotMedia,
    }
}

/// Copies photos and videos from one conversation to another, oldest first,
/// one message at a time.
pub struct Migrator<'a> {
    connection: &'a dyn Connection,
    policy: &'a RetryPolicy,
    sleeper: &'a dyn Sleeper,
    sink: &'a dyn ProgressSink,
    progress_every: u64,
}

impl<'a> Migrator<'a> {
    pub fn new(
        connection: &'a dyn Connection,
        policy: &'a RetryPolicy,
        sleeper: &'a dyn Sleeper,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            connection,
            policy,
            sleeper,
            sink,
            progress_every: 5,
        }
    }

    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every.max(1);
        self
    }

    /// Runs to completion, cancellation, or the first fatal error. Failures on
    /// single messages are reported and skipped; the returned report always
    /// carries the count reached so far.
    pub async fn run(
        &self,
        source: &ConversationHandle,
        destination: &ConversationHandle,
        cancel: &CancellationToken,
    ) -> MigrationReport {
        migrator_info!("migration {} -> {} started", source.id, destination.id);
        let mut report = MigrationReport::default();
        let mut history = self.connection.messages_oldest_first(source);

        while let Some(item) = history.next().await {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let message = match item {
                Ok(message) => message,
                Err(err) => {
                    migrator_warn!("history iteration failed: {}", err);
                    report.aborted = Some(err.to_string());
                    break;
                }
            };
            report.examined += 1;

            let eligibility = classify(&message);
            if eligibility != Eligibility::Eligible {
                migrator_debug!("skipping message {} ({:?})", message.id, eligibility);
                continue;
            }
            report.eligible += 1;

            match self.forward_with_retry(source, destination, &message).await {
                Ok(()) => {
                    report.forwarded += 1;
                    if report.forwarded % self.progress_every == 0 {
                        self.emit_progress(&report);
                    }
                }
                Err(err) if err.kind == PlatformErrorKind::ConnectionLost => {
                    migrator_warn!("connection lost while forwarding {}: {}", message.id, err);
                    report.failed += 1;
                    report.aborted = Some(err.to_string());
                    break;
                }
                Err(err) => {
                    migrator_warn!("message {} not forwarded: {}", message.id, err);
                    report.failed += 1;
                    self.sink.emit(EngineEvent::MessageFailed {
                        message_id: message.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if report.forwarded % self.progress_every != 0 {
            self.emit_progress(&report);
        }
        migrator_info!(
            "migration {} -> {} finished: {:?}",
            source.id,
            destination.id,
            report
        );
        report
    }

    async fn forward_with_retry(
        &self,
        source: &ConversationHandle,
        destination: &ConversationHandle,
        message: &Message,
    ) -> Result<(), PlatformError> {
        let err = match self
            .connection
            .forward_message(source, destination, message.id)
            .await
        {
            Ok(()) => return Ok(()),
            Err(err) if err.kind == PlatformErrorKind::RateLimited => err,
            Err(err) => return Err(err),
        };

        let wait = self.policy.wait_for(&err);
        migrator_info!(
            "rate limited on message {}; sleeping {}s before the single retry",
            message.id,
            wait.as_secs()
        );
        self.sink.emit(EngineEvent::RateLimited {
            message_id: message.id,
            seconds: wait.as_secs(),
        });
        self.sleeper.sleep(wait).await;
        self.connection
            .forward_message(source, destination, message.id)
            .await
    }

    fn emit_progress(&self, report: &MigrationReport) {
        self.sink.emit(EngineEvent::MigrationProgress {
            forwarded: report.forwarded,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, Eligibility};
    use crate::{MediaKind, Message};

    fn message(service: bool, media: Option<MediaKind>) -> Message {
        Message {
            id: 1,
            service,
            media,
        }
    }

    #[test]
    fn only_photos_and_videos_are_eligible() {
        assert_eq!(classify(&message(false, Some(MediaKind::Photo))), Eligibility::Eligible);
        assert_eq!(classify(&message(false, Some(MediaKind::Video))), Eligibility::Eligible);
        assert_eq!(classify(&message(false, None)), Eligibility::NotMedia);
        for kind in [
            MediaKind::Document,
            MediaKind::Audio,
            MediaKind::Sticker,
            MediaKind::Poll,
            MediaKind::Other,
        ] {
            assert_eq!(classify(&message(false, Some(kind))), Eligibility::NotMedia);
        }
    }

    #[test]
    fn service_and_link_previews_are_skipped_first() {
        assert_eq!(classify(&message(true, Some(MediaKind::Photo))), Eligibility::Service);
        assert_eq!(
            classify(&message(false, Some(MediaKind::WebPage))),
            Eligibility::LinkPreview
        );
    }
}
