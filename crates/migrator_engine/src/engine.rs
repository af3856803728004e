use std::sync::{Arc, Mutex};

use migrator_logging::{migrator_debug, migrator_info, migrator_warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    authenticate, index_conversations, ChannelProgressSink, Connection, Connector,
    ConversationHandle, Credentials, EngineEvent, EngineSettings, IndexError, Migrator,
    MigrationReport, PlatformError, ProgressSink, RetryPolicy, Sleeper, TokioSleeper,
};

enum EngineCommand {
    Authenticate(Credentials),
    Index,
    Migrate {
        source: i64,
        destination: i64,
        cancel: CancellationToken,
    },
    Disconnect,
}

/// Handle to one session's worker. Commands run strictly one after another;
/// dropping the handle stops the worker and releases the connection.
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    latest_run: Mutex<Option<CancellationToken>>,
}

impl EngineHandle {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        settings: EngineSettings,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        Self::spawn_with_sleeper(connector, settings, Arc::new(TokioSleeper))
    }

    pub fn spawn_with_sleeper(
        connector: Arc<dyn Connector>,
        settings: EngineSettings,
        sleeper: Arc<dyn Sleeper>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            connector,
            policy: RetryPolicy::from_settings(&settings.migrate),
            settings,
            sleeper,
            sink: ChannelProgressSink::new(event_tx),
            connection: None,
            conversations: Vec::new(),
        };
        tokio::spawn(worker.run(cmd_rx));

        (
            Self {
                cmd_tx,
                latest_run: Mutex::new(None),
            },
            event_rx,
        )
    }

    pub fn authenticate(&self, credentials: Credentials) {
        self.send(EngineCommand::Authenticate(credentials));
    }

    pub fn index(&self) {
        self.send(EngineCommand::Index);
    }

    /// Queues a migration. Its cancellation token is armed here, so a cancel
    /// issued while the command still waits in the queue is not lost.
    pub fn migrate(&self, source: i64, destination: i64) {
        let cancel = CancellationToken::new();
        if let Ok(mut slot) = self.latest_run.lock() {
            *slot = Some(cancel.clone());
        }
        self.send(EngineCommand::Migrate {
            source,
            destination,
            cancel,
        });
    }

    pub fn disconnect(&self) {
        self.send(EngineCommand::Disconnect);
    }

    /// Takes effect between two messages of the latest migration, including
    /// one not yet started; a finished run ignores it.
    pub fn cancel_migration(&self) {
        if let Ok(slot) = self.latest_run.lock() {
            if let Some(token) = slot.as_ref() {
                token.cancel();
            }
        }
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            migrator_warn!("engine worker is gone; command dropped");
        }
    }
}

struct Worker {
    connector: Arc<dyn Connector>,
    settings: EngineSettings,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    sink: ChannelProgressSink,
    connection: Option<Box<dyn Connection>>,
    conversations: Vec<ConversationHandle>,
}

impl Worker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>) {
        while let Some(command) = cmd_rx.recv().await {
            self.handle(command).await;
        }
        if let Some(connection) = self.connection.take() {
            connection.disconnect().await;
        }
        migrator_debug!("engine worker stopped");
    }

    async fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Authenticate(credentials) => self.authenticate(credentials).await,
            EngineCommand::Index => self.index().await,
            EngineCommand::Migrate {
                source,
                destination,
                cancel,
            } => {
                let report = self.migrate(source, destination, &cancel).await;
                self.sink.emit(EngineEvent::MigrationFinished(report));
            }
            EngineCommand::Disconnect => {
                self.conversations.clear();
                if let Some(connection) = self.connection.take() {
                    connection.disconnect().await;
                    migrator_info!("connection closed on request");
                }
            }
        }
    }

    async fn authenticate(&mut self, credentials: Credentials) {
        if let Some(previous) = self.connection.take() {
            previous.disconnect().await;
        }
        self.conversations.clear();

        match authenticate(
            self.connector.as_ref(),
            &credentials,
            &self.settings.auth,
            &self.sink,
        )
        .await
        {
            Ok(authorized) => {
                self.connection = Some(authorized.connection);
                self.sink.emit(EngineEvent::Authorized {
                    resumed: authorized.resumed,
                    session_token: authorized.session_token,
                });
            }
            Err(err) => {
                migrator_warn!("authentication failed: {}", err);
                self.sink.emit(EngineEvent::AuthFailed(err));
            }
        }
    }

    async fn index(&mut self) {
        let result = match self.ready_connection().await {
            Ok(Some(connection)) => index_conversations(connection, &self.settings.index).await,
            Ok(None) => Err(IndexError::NotConnected),
            Err(err) => Err(IndexError::Failed(err)),
        };
        match result {
            Ok(conversations) => {
                self.conversations = conversations.clone();
                self.sink.emit(EngineEvent::ConversationsIndexed(conversations));
            }
            Err(err) => {
                migrator_warn!("indexing failed: {}", err);
                self.conversations.clear();
                self.sink.emit(EngineEvent::IndexingFailed(err));
            }
        }
    }

    async fn migrate(
        &self,
        source: i64,
        destination: i64,
        cancel: &CancellationToken,
    ) -> MigrationReport {
        let (Some(source), Some(destination)) = (self.find(source), self.find(destination)) else {
            return aborted("unknown conversation; reload the list");
        };
        if source.id == destination.id {
            return aborted("source and destination are the same conversation");
        }
        if cancel.is_cancelled() {
            migrator_info!(
                "migration {} -> {} cancelled before start",
                source.id,
                destination.id
            );
            return MigrationReport {
                cancelled: true,
                ..MigrationReport::default()
            };
        }
        let connection = match self.ready_connection().await {
            Ok(Some(connection)) => connection,
            Ok(None) => return aborted("no authorized connection; sign in again"),
            Err(err) => return aborted(&err.to_string()),
        };

        Migrator::new(connection, &self.policy, self.sleeper.as_ref(), &self.sink)
            .with_progress_every(self.settings.migrate.progress_every)
            .run(source, destination, cancel)
            .await
    }

    /// The owned connection, reconnected first if the platform dropped it.
    async fn ready_connection(&self) -> Result<Option<&dyn Connection>, PlatformError> {
        let Some(connection) = self.connection.as_deref() else {
            return Ok(None);
        };
        if !connection.is_connected().await {
            migrator_info!("connection dropped; reconnecting");
            connection.reconnect().await?;
            self.sink
                .emit(EngineEvent::Notice("Connection re-established.".to_string()));
        }
        Ok(Some(connection))
    }

    fn find(&self, id: i64) -> Option<&ConversationHandle> {
        self.conversations.iter().find(|handle| handle.id == id)
    }
}

fn aborted(reason: &str) -> MigrationReport {
    MigrationReport {
        aborted: Some(reason.to_string()),
        ..MigrationReport::default()
    }
}
