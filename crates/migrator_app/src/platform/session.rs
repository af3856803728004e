use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use migrator_core::{update, AppState, AppViewModel, Msg};
use migrator_engine::{Connector, EngineEvent, EngineHandle, EngineSettings};
use migrator_logging::{migrator_debug, migrator_info};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::effects::{event_to_msg, EffectRunner};

/// One browser's state: its core state machine and its engine worker.
pub struct Session {
    state: Mutex<AppState>,
    runner: EffectRunner,
    last_seen: Mutex<DateTime<Utc>>,
}

impl Session {
    pub fn spawn(connector: Arc<dyn Connector>, settings: EngineSettings) -> Arc<Self> {
        let (engine, events) = EngineHandle::spawn(connector, settings);
        Self::with_engine(engine, events)
    }

    fn with_engine(engine: EngineHandle, events: UnboundedReceiver<EngineEvent>) -> Arc<Self> {
        let session = Arc::new(Self {
            state: Mutex::new(AppState::new()),
            runner: EffectRunner::new(engine),
            last_seen: Mutex::new(Utc::now()),
        });
        tokio::spawn(pump_events(Arc::downgrade(&session), events));
        session
    }

    /// Runs `msg` through `update` and executes the resulting effects.
    pub fn dispatch(&self, msg: Msg) {
        let mut pending = VecDeque::from([msg]);
        while let Some(msg) = pending.pop_front() {
            let effects = {
                let mut guard = lock(&self.state);
                let state = std::mem::take(&mut *guard);
                let (state, effects) = update(state, msg);
                *guard = state;
                effects
            };
            pending.extend(self.runner.run(effects));
        }
    }

    pub fn view(&self) -> AppViewModel {
        lock(&self.state).view()
    }

    pub fn touch(&self) {
        *lock(&self.last_seen) = Utc::now();
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        *lock(&self.last_seen)
    }
}

// The worker only notices a dropped handle between commands.
impl Drop for Session {
    fn drop(&mut self) {
        self.runner.cancel_running();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeds engine events back into the session until either side is gone.
async fn pump_events(session: Weak<Session>, mut events: UnboundedReceiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        let Some(session) = session.upgrade() else {
            break;
        };
        session.dispatch(event_to_msg(event));
    }
    migrator_debug!("session event pump stopped");
}

/// Sessions keyed by the id carried in the browser cookie.
pub struct SessionStore {
    sessions: DashMap<Uuid, Arc<Session>>,
    connector: Arc<dyn Connector>,
    settings: EngineSettings,
}

impl SessionStore {
    pub fn new(connector: Arc<dyn Connector>, settings: EngineSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            connector,
            settings,
        }
    }

    /// The live session for `id`, if any. Never creates one.
    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = Arc::clone(self.sessions.get(&id)?.value());
        session.touch();
        Some(session)
    }

    /// The live session for `id`, or a fresh one under a new id.
    pub fn resolve(&self, id: Option<Uuid>) -> (Uuid, Arc<Session>) {
        let existing = id.and_then(|id| {
            self.sessions
                .get(&id)
                .map(|entry| (id, Arc::clone(entry.value())))
        });
        if let Some((id, session)) = existing {
            session.touch();
            return (id, session);
        }

        let id = Uuid::new_v4();
        let session = Session::spawn(Arc::clone(&self.connector), self.settings.clone());
        self.sessions.insert(id, Arc::clone(&session));
        migrator_info!("session {} created ({} live)", id, self.len());
        (id, session)
    }

    /// Drops sessions not seen for longer than `max_idle`; returns how many.
    pub fn evict_idle(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.signed_duration_since(session.last_seen()) <= max_idle);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            migrator_info!("evicted {} idle sessions ({} live)", evicted, self.len());
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use migrator_core::{AppSecret, Msg, Phase};
    use migrator_engine::EngineSettings;

    use super::SessionStore;
    use crate::platform::test_support::RejectingConnector;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(RejectingConnector), EngineSettings::default())
    }

    #[tokio::test]
    async fn cookie_id_resolves_to_the_same_session() {
        let store = store();
        let (id, first) = store.resolve(None);
        let (same_id, second) = store.resolve(Some(id));

        assert_eq!(id, same_id);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn lookup_never_spawns_a_session() {
        let store = store();
        assert!(store.get(uuid::Uuid::new_v4()).is_none());
        assert_eq!(store.len(), 0);

        let (id, created) = store.resolve(None);
        let found = store.get(id).unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_cookie_id_gets_a_fresh_session() {
        let store = store();
        let stale = uuid::Uuid::new_v4();
        let (id, _) = store.resolve(Some(stale));

        assert_ne!(id, stale);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let store = store();
        store.resolve(None);
        let later = chrono::Utc::now() + chrono::Duration::try_minutes(31).unwrap();

        assert_eq!(store.evict_idle(later, chrono::Duration::try_minutes(30).unwrap()), 1);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn rejected_sign_in_comes_back_as_an_error_banner() {
        let store = store();
        let (_, session) = store.resolve(None);

        session.dispatch(Msg::CredentialsSubmitted {
            app_id: "12345".to_string(),
            app_secret: AppSecret::new("0123456789abcdef"),
        });
        assert_eq!(session.view().phase, Phase::AwaitingChallenge);

        let view = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let view = session.view();
                if view.error.is_some() {
                    return view;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(view.phase, Phase::Unauthenticated);
        assert_eq!(
            view.error.as_deref(),
            Some("Credentials rejected: API_ID_INVALID")
        );
    }
}
