use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use migrator_core::{AppSecret, AppState, AppViewModel, Msg};
use migrator_engine::{Connector, HttpConnector};
use migrator_logging::{migrator_debug, migrator_info, migrator_warn};
use serde::Deserialize;
use uuid::Uuid;

use super::config;
use super::logging;
use super::session::{Session, SessionStore};
use super::ui::constants::*;
use super::ui::layout::PageChrome;
use super::ui::render::render;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_app() -> anyhow::Result<()> {
    let config_path = config::config_path();
    let config = config::load(&config_path)?;
    logging::initialize(config.log);
    let addr = config.bind_addr()?;
    migrator_info!(
        "config {:?}; bridge at {}",
        config_path,
        config.engine.bridge.base_url
    );

    let connector: Arc<dyn Connector> = Arc::new(HttpConnector::new(config.engine.bridge.clone()));
    let store = Arc::new(SessionStore::new(connector, config.engine.clone()));
    spawn_idle_sweeper(Arc::clone(&store), config.session_idle());

    let chrome = PageChrome {
        public_host: !addr.ip().is_loopback(),
    };
    if chrome.public_host {
        migrator_warn!("listening on non-loopback address {}; anyone who can reach it can use it", addr);
    }
    let router = build_router(ServerState { store, chrome });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    migrator_info!("control panel on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    migrator_info!("shut down");
    Ok(())
}

#[derive(Clone)]
struct ServerState {
    store: Arc<SessionStore>,
    chrome: PageChrome,
}

impl ServerState {
    fn known_id(jar: &CookieJar) -> Option<Uuid> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    }

    /// The caller's live session, if its cookie names one.
    fn existing(&self, jar: &CookieJar) -> Option<Arc<Session>> {
        Self::known_id(jar).and_then(|id| self.store.get(id))
    }

    /// Resolves the caller's session, issuing a cookie when it is new.
    fn session(&self, jar: CookieJar) -> (CookieJar, Arc<Session>) {
        let known = Self::known_id(&jar);
        let (id, session) = self.store.resolve(known);
        let jar = if known == Some(id) {
            jar
        } else {
            jar.add(session_cookie(id))
        };
        (jar, session)
    }

    /// Visitors without a session see the initial screen; no worker is spawned
    /// until they submit something.
    fn view(&self, jar: &CookieJar) -> AppViewModel {
        match self.existing(jar) {
            Some(session) => session.view(),
            None => AppState::new().view(),
        }
    }
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn build_router(state: ServerState) -> Router {
    Router::new()
        .route(ROUTE_INDEX, get(index_handler))
        .route(ROUTE_VIEW_JSON, get(view_handler))
        .route(ROUTE_HEALTH, get(health_handler))
        .route(ROUTE_CONNECT, post(connect_handler))
        .route(ROUTE_MIGRATE, post(migrate_handler))
        .route(ROUTE_CANCEL, post(cancel_handler))
        .route(ROUTE_RELOAD, post(reload_handler))
        .route(ROUTE_SIGN_OUT, post(sign_out_handler))
        .with_state(state)
}

fn spawn_idle_sweeper(store: Arc<SessionStore>, max_idle: chrono::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            store.evict_idle(Utc::now(), max_idle);
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        migrator_warn!("cannot listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

async fn index_handler(State(state): State<ServerState>, jar: CookieJar) -> Html<String> {
    Html(render(&state.view(&jar), &state.chrome))
}

async fn view_handler(State(state): State<ServerState>, jar: CookieJar) -> Json<AppViewModel> {
    Json(state.view(&jar))
}

async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct ConnectForm {
    #[serde(default)]
    app_id: String,
    #[serde(default)]
    app_secret: String,
}

async fn connect_handler(
    State(state): State<ServerState>,
    jar: CookieJar,
    Form(form): Form<ConnectForm>,
) -> (CookieJar, Redirect) {
    dispatch(
        &state,
        jar,
        Msg::CredentialsSubmitted {
            app_id: form.app_id,
            app_secret: AppSecret::new(form.app_secret),
        },
    )
}

#[derive(Deserialize)]
struct MigrateForm {
    #[serde(default)]
    source: String,
    #[serde(default)]
    destination: String,
}

async fn migrate_handler(
    State(state): State<ServerState>,
    jar: CookieJar,
    Form(form): Form<MigrateForm>,
) -> (CookieJar, Redirect) {
    let msg = match (form.source.parse(), form.destination.parse()) {
        (Ok(source), Ok(destination)) => Msg::MigrateClicked {
            source,
            destination,
        },
        _ => Msg::Notice("Pick both a source and a destination conversation.".to_string()),
    };
    dispatch(&state, jar, msg)
}

async fn cancel_handler(State(state): State<ServerState>, jar: CookieJar) -> Redirect {
    dispatch_existing(&state, &jar, Msg::CancelClicked)
}

async fn reload_handler(State(state): State<ServerState>, jar: CookieJar) -> Redirect {
    dispatch_existing(&state, &jar, Msg::ReloadClicked)
}

async fn sign_out_handler(State(state): State<ServerState>, jar: CookieJar) -> Redirect {
    dispatch_existing(&state, &jar, Msg::SignOutClicked)
}

fn dispatch(state: &ServerState, jar: CookieJar, msg: Msg) -> (CookieJar, Redirect) {
    let (jar, session) = state.session(jar);
    session.dispatch(msg);
    (jar, Redirect::to(ROUTE_INDEX))
}

/// Cancel, reload and sign-out have nothing to act on without a session.
fn dispatch_existing(state: &ServerState, jar: &CookieJar, msg: Msg) -> Redirect {
    match state.existing(jar) {
        Some(session) => session.dispatch(msg),
        None => migrator_debug!("ignoring {:?} without a session", msg),
    }
    Redirect::to(ROUTE_INDEX)
}
