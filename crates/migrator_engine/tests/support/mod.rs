//! In-memory platform used by the engine integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use migrator_engine::{
    Connection, Connector, ConversationHandle, ConversationKind, Credentials, Dialog,
    EngineEvent, MediaKind, Message, MessageStream, PlatformError, PlatformErrorKind,
    ProgressSink, QrChallenge, Sleeper,
};

pub fn photo(id: i64) -> Message {
    Message {
        id,
        service: false,
        media: Some(MediaKind::Photo),
    }
}

pub fn video(id: i64) -> Message {
    Message {
        id,
        service: false,
        media: Some(MediaKind::Video),
    }
}

pub fn text(id: i64) -> Message {
    Message {
        id,
        service: false,
        media: None,
    }
}

pub fn service(id: i64) -> Message {
    Message {
        id,
        service: true,
        media: None,
    }
}

pub fn link_preview(id: i64) -> Message {
    Message {
        id,
        service: false,
        media: Some(MediaKind::WebPage),
    }
}

pub fn handle(id: i64, name: &str) -> ConversationHandle {
    ConversationHandle {
        id,
        kind: ConversationKind::Group,
        name: name.to_string(),
        peer: format!("peer-{id}"),
        label: format!("👥 {name} (ID: {id})"),
    }
}

#[derive(Debug, Clone)]
pub enum QrOutcome {
    Confirm,
    Fail(PlatformError),
    Never,
}

/// Shared, inspectable state behind every [`FakeConnection`] clone.
pub struct FakeState {
    pub authorized: Mutex<bool>,
    /// When set, the authorization check fails with this error.
    pub authorized_error: Mutex<Option<PlatformError>>,
    /// When set, starting a QR login fails with this error.
    pub begin_error: Mutex<Option<PlatformError>>,
    pub connected: Mutex<bool>,
    pub reconnects: Mutex<u32>,
    pub disconnects: Mutex<u32>,
    pub qr_outcome: Mutex<QrOutcome>,
    pub authorize_on_confirm: Mutex<bool>,
    pub dialogs: Mutex<Result<Vec<Dialog>, PlatformError>>,
    pub history: Mutex<Vec<Result<Message, PlatformError>>>,
    /// Scripted forward results, consumed in order; empty means success.
    pub forward_script: Mutex<VecDeque<Result<(), PlatformError>>>,
    pub forward_attempts: Mutex<Vec<i64>>,
    pub forwarded: Mutex<Vec<(i64, i64)>>,
}

#[derive(Clone)]
pub struct FakeConnection {
    pub state: Arc<FakeState>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self {
            state: Arc::new(FakeState {
                authorized: Mutex::new(false),
                authorized_error: Mutex::new(None),
                begin_error: Mutex::new(None),
                connected: Mutex::new(true),
                reconnects: Mutex::new(0),
                disconnects: Mutex::new(0),
                qr_outcome: Mutex::new(QrOutcome::Confirm),
                authorize_on_confirm: Mutex::new(true),
                dialogs: Mutex::new(Ok(Vec::new())),
                history: Mutex::new(Vec::new()),
                forward_script: Mutex::new(VecDeque::new()),
                forward_attempts: Mutex::new(Vec::new()),
                forwarded: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn with_history(self, messages: Vec<Message>) -> Self {
        *self.state.history.lock().unwrap() = messages.into_iter().map(Ok).collect();
        self
    }

    pub fn with_history_results(self, items: Vec<Result<Message, PlatformError>>) -> Self {
        *self.state.history.lock().unwrap() = items;
        self
    }

    pub fn with_dialogs(self, dialogs: Vec<Dialog>) -> Self {
        *self.state.dialogs.lock().unwrap() = Ok(dialogs);
        self
    }

    pub fn script_forward(&self, results: Vec<Result<(), PlatformError>>) {
        self.state.forward_script.lock().unwrap().extend(results);
    }

    pub fn forwarded_ids(&self) -> Vec<i64> {
        self.state
            .forwarded
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn forward_attempts(&self) -> Vec<i64> {
        self.state.forward_attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Connection for FakeConnection {
    async fn is_connected(&self) -> bool {
        *self.state.connected.lock().unwrap()
    }

    async fn reconnect(&self) -> Result<(), PlatformError> {
        *self.state.reconnects.lock().unwrap() += 1;
        *self.state.connected.lock().unwrap() = true;
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool, PlatformError> {
        if let Some(err) = self.state.authorized_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(*self.state.authorized.lock().unwrap())
    }

    async fn begin_qr_login(&self) -> Result<QrChallenge, PlatformError> {
        if let Some(err) = self.state.begin_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(QrChallenge {
            token: "challenge-1".to_string(),
            url: "tg://login?token=AQID".to_string(),
            expires_in_secs: 30,
        })
    }

    async fn wait_qr_login(&self, _challenge: &QrChallenge) -> Result<(), PlatformError> {
        let outcome = self.state.qr_outcome.lock().unwrap().clone();
        match outcome {
            QrOutcome::Confirm => {
                if *self.state.authorize_on_confirm.lock().unwrap() {
                    *self.state.authorized.lock().unwrap() = true;
                }
                Ok(())
            }
            QrOutcome::Fail(err) => Err(err),
            QrOutcome::Never => std::future::pending().await,
        }
    }

    async fn list_dialogs(&self) -> Result<Vec<Dialog>, PlatformError> {
        self.state.dialogs.lock().unwrap().clone()
    }

    fn messages_oldest_first<'a>(&'a self, _conversation: &ConversationHandle) -> MessageStream<'a> {
        let items = self.state.history.lock().unwrap().clone();
        stream::iter(items).boxed()
    }

    async fn forward_message(
        &self,
        _source: &ConversationHandle,
        destination: &ConversationHandle,
        message_id: i64,
    ) -> Result<(), PlatformError> {
        self.state.forward_attempts.lock().unwrap().push(message_id);
        let scripted = self.state.forward_script.lock().unwrap().pop_front();
        match scripted {
            Some(Err(err)) => Err(err),
            Some(Ok(())) | None => {
                self.state
                    .forwarded
                    .lock()
                    .unwrap()
                    .push((message_id, destination.id));
                Ok(())
            }
        }
    }

    async fn export_session(&self) -> Option<String> {
        Some("1BVtsOK4Bu-session".to_string())
    }

    async fn disconnect(&self) {
        *self.state.disconnects.lock().unwrap() += 1;
    }
}

/// Hands out clones of one [`FakeConnection`], or rejects the credentials.
pub struct FakeConnector {
    pub connection: FakeConnection,
    pub reject_with: Option<PlatformError>,
    pub connects: Mutex<u32>,
}

impl FakeConnector {
    pub fn new(connection: FakeConnection) -> Self {
        Self {
            connection,
            reject_with: None,
            connects: Mutex::new(0),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            connection: FakeConnection::new(),
            reject_with: Some(PlatformError::new(PlatformErrorKind::Unauthorized, message)),
            connects: Mutex::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn Connection>, PlatformError> {
        *self.connects.lock().unwrap() += 1;
        match &self.reject_with {
            Some(err) => Err(err.clone()),
            None => Ok(Box::new(self.connection.clone())),
        }
    }
}

#[derive(Default)]
pub struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}
