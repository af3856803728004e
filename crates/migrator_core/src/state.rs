use std::fmt;

use serde::Serialize;

use crate::view_model::{AppViewModel, ChallengeView, ConversationOption};
use crate::ActivityLog;

pub type ConversationId = i64;

/// Where the session is in the authenticate → index → migrate pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Unauthenticated,
    AwaitingChallenge,
    /// Authorized; conversation list not (yet) available.
    Authenticated,
    Indexed,
    Migrating,
    Done,
}

impl Phase {
    pub fn is_authorized(self) -> bool {
        matches!(
            self,
            Phase::Authenticated | Phase::Indexed | Phase::Migrating | Phase::Done
        )
    }
}

/// Application secret typed in by the user. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AppSecret(String);

impl AppSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppSecret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationEntry {
    pub id: ConversationId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub url: String,
    /// Displayable image (data URL), absent if rendering failed.
    pub image: Option<String>,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthFailure {
    InvalidCredentials,
    ChallengeExpired,
    Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationSummary {
    pub examined: u64,
    pub eligible: u64,
    pub forwarded: u64,
    pub failed: u64,
    pub aborted: Option<String>,
    pub cancelled: bool,
}

/// Final human-readable line shown to the user after a run.
pub fn summary_text(summary: &MigrationSummary) -> String {
    let moved = summary.forwarded;
    if let Some(reason) = &summary.aborted {
        format!("Stopped early ({reason}). {moved} files moved.")
    } else if summary.cancelled {
        format!("Cancelled. {moved} files moved.")
    } else {
        format!("Completed. {moved} files moved.")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    phase: Phase,
    challenge: Option<Challenge>,
    conversations: Vec<ConversationEntry>,
    source: Option<ConversationId>,
    destination: Option<ConversationId>,
    forwarded: u64,
    failed: u64,
    status: Option<String>,
    summary: Option<String>,
    error: Option<String>,
    session_token: Option<String>,
    cancel_requested: bool,
    activity: ActivityLog,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn conversations(&self) -> &[ConversationEntry] {
        &self.conversations
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn view(&self) -> AppViewModel {
        let busy = matches!(
            self.phase,
            Phase::AwaitingChallenge | Phase::Authenticated | Phase::Migrating
        );
        let can_start = matches!(self.phase, Phase::Indexed | Phase::Done);

        AppViewModel {
            phase: self.phase,
            show_login: matches!(self.phase, Phase::Unauthenticated | Phase::AwaitingChallenge),
            login_enabled: self.phase == Phase::Unauthenticated,
            challenge: self.challenge.as_ref().map(|c| ChallengeView {
                url: c.url.clone(),
                image: c.image.clone(),
                expires_in_secs: c.expires_in_secs,
            }),
            conversations: self
                .conversations
                .iter()
                .map(|entry| ConversationOption {
                    id: entry.id,
                    label: entry.label.clone(),
                    is_source: self.source == Some(entry.id),
                    is_destination: self.destination == Some(entry.id),
                })
                .collect(),
            migrate_enabled: can_start && self.conversations.len() > 1,
            cancel_enabled: self.phase == Phase::Migrating && !self.cancel_requested,
            reload_enabled: can_start || (self.phase == Phase::Authenticated && self.error.is_some()),
            sign_out_enabled: self.phase.is_authorized() && self.phase != Phase::Migrating,
            busy: busy && self.error.is_none(),
            status: self.status.clone(),
            forwarded: self.forwarded,
            failed: self.failed,
            summary: self.summary.clone(),
            error: self.error.clone(),
            session_token: self.session_token.clone(),
            activity: self.activity.entries().to_vec(),
        }
    }

    pub(crate) fn log(&mut self, line: impl Into<String>) {
        self.activity.push(line);
    }

    pub(crate) fn set_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.activity.push(format!("Error: {error}"));
        self.error = Some(error);
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn begin_authentication(&mut self) {
        self.phase = Phase::AwaitingChallenge;
        self.challenge = None;
        self.status = Some("Connecting...".to_string());
    }

    pub(crate) fn set_challenge(&mut self, challenge: Challenge) {
        self.status = Some(format!(
            "Scan the QR code within {} seconds (Settings > Devices > Link Desktop Device).",
            challenge.expires_in_secs
        ));
        self.challenge = Some(challenge);
    }

    pub(crate) fn authorize(&mut self, session_token: Option<String>) {
        self.phase = Phase::Authenticated;
        self.challenge = None;
        self.session_token = session_token;
        self.status = Some("Loading conversations...".to_string());
    }

    pub(crate) fn reset_to_login(&mut self) {
        self.phase = Phase::Unauthenticated;
        self.challenge = None;
        self.status = None;
    }

    pub(crate) fn begin_indexing(&mut self) {
        self.phase = Phase::Authenticated;
        self.conversations.clear();
        self.source = None;
        self.destination = None;
        self.status = Some("Loading conversations...".to_string());
    }

    pub(crate) fn set_conversations(&mut self, conversations: Vec<ConversationEntry>) {
        self.phase = Phase::Indexed;
        self.conversations = conversations;
        self.status = None;
    }

    pub(crate) fn indexing_failed(&mut self) {
        self.phase = Phase::Authenticated;
        self.conversations.clear();
        self.status = None;
    }

    pub(crate) fn label_of(&self, id: ConversationId) -> Option<&str> {
        self.conversations
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.label.as_str())
    }

    pub(crate) fn start_migration(&mut self, source: ConversationId, destination: ConversationId) {
        self.phase = Phase::Migrating;
        self.source = Some(source);
        self.destination = Some(destination);
        self.forwarded = 0;
        self.failed = 0;
        self.summary = None;
        self.cancel_requested = false;
        self.status = Some("Starting migration...".to_string());
    }

    pub(crate) fn set_progress(&mut self, forwarded: u64) {
        self.forwarded = forwarded;
        self.status = Some(format!("Moving file #{forwarded}..."));
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub(crate) fn request_cancel(&mut self) {
        self.cancel_requested = true;
        self.status = Some("Stopping after the current message...".to_string());
    }

    pub(crate) fn finish_migration(&mut self, summary: &MigrationSummary) {
        self.phase = Phase::Done;
        self.forwarded = summary.forwarded;
        self.failed = summary.failed;
        self.cancel_requested = false;
        self.status = None;
        self.summary = Some(summary_text(summary));
    }

    /// Drops everything tied to the connection; the activity log survives.
    pub(crate) fn sign_out(&mut self) {
        let activity = std::mem::take(&mut self.activity);
        *self = Self {
            activity,
            ..Self::default()
        };
    }
}
