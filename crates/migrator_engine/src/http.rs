use std::time::Duration;

use futures_util::{stream, StreamExt, TryStreamExt};
use migrator_logging::{migrator_debug, migrator_trace};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::{
    BridgeSettings, Connection, Connector, ConversationHandle, Credentials, Dialog, Message,
    MessageStream, PlatformError, PlatformErrorKind, QrChallenge,
};

/// Grace added on top of the challenge lifetime for the long-poll request.
const WAIT_REQUEST_SLACK: Duration = Duration::from_secs(5);

/// Talks to the platform bridge, a sidecar that owns the wire protocol and
/// exposes sessions over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    settings: BridgeSettings,
}

impl HttpConnector {
    pub fn new(settings: BridgeSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, PlatformError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout())
            .timeout(self.settings.request_timeout())
            .build()
            .map_err(|err| PlatformError::new(PlatformErrorKind::Other, err.to_string()))
    }
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    api_id: i32,
    api_hash: &'a str,
}

#[derive(Deserialize)]
struct ConnectResponse {
    connection_id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    connected: bool,
}

#[derive(Deserialize)]
struct AuthorizedResponse {
    authorized: bool,
}

#[derive(Deserialize)]
struct MessagesPage {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ExportResponse {
    session: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct ForwardRequest<'a> {
    from_peer: &'a str,
    to_peer: &'a str,
    message_id: i64,
}

#[async_trait::async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn Connection>, PlatformError> {
        let base = Url::parse(&self.settings.base_url)
            .map_err(|err| PlatformError::new(PlatformErrorKind::Protocol, err.to_string()))?;
        let client = self.build_client()?;
        let url = endpoint(&base, &["connect"])?;

        migrator_debug!("connecting to bridge at {} with {:?}", base, credentials);
        let response = client
            .post(url)
            .json(&ConnectRequest {
                api_id: credentials.app_id(),
                api_hash: credentials.app_secret(),
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body: ConnectResponse = expect_success(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)?;

        Ok(Box::new(HttpConnection {
            client,
            base,
            connection_id: body.connection_id,
            page_size: self.settings.page_size.max(1),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: reqwest::Client,
    base: Url,
    connection_id: String,
    page_size: u32,
}

impl HttpConnection {
    fn session_url(&self, tail: &[&str]) -> Result<Url, PlatformError> {
        let mut segments = vec!["sessions", self.connection_id.as_str()];
        segments.extend_from_slice(tail);
        endpoint(&self.base, &segments)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, PlatformError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        expect_success(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)
    }

    async fn next_page(
        &self,
        peer: &str,
        cursor: Option<i64>,
    ) -> Result<Option<(Vec<Message>, Option<i64>)>, PlatformError> {
        let Some(min_id) = cursor else {
            return Ok(None);
        };
        let mut url = self.session_url(&["dialogs", peer, "messages"])?;
        url.query_pairs_mut()
            .append_pair("reverse", "true")
            .append_pair("min_id", &min_id.to_string())
            .append_pair("limit", &self.page_size.to_string());

        let page: MessagesPage = self.get_json(url).await?;
        migrator_trace!("fetched {} messages after id {}", page.messages.len(), min_id);
        if page.messages.is_empty() {
            return Ok(None);
        }
        let next = if page.messages.len() < self.page_size as usize {
            None
        } else {
            page.messages.last().map(|message| message.id)
        };
        Ok(Some((page.messages, next)))
    }
}

#[async_trait::async_trait]
impl Connection for HttpConnection {
    async fn is_connected(&self) -> bool {
        let Ok(url) = self.session_url(&["status"]) else {
            return false;
        };
        match self.get_json::<StatusResponse>(url).await {
            Ok(status) => status.connected,
            Err(err) => {
                migrator_debug!("status check failed: {}", err);
                false
            }
        }
    }

    async fn reconnect(&self) -> Result<(), PlatformError> {
        let url = self.session_url(&["reconnect"])?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        expect_success(response).await.map(|_| ())
    }

    async fn is_authorized(&self) -> Result<bool, PlatformError> {
        let url = self.session_url(&["authorized"])?;
        let body: AuthorizedResponse = self.get_json(url).await?;
        Ok(body.authorized)
    }

    async fn begin_qr_login(&self) -> Result<QrChallenge, PlatformError> {
        let url = self.session_url(&["qr-login"])?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        expect_success(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)
    }

    async fn wait_qr_login(&self, challenge: &QrChallenge) -> Result<(), PlatformError> {
        let url = self.session_url(&["qr-login", &challenge.token, "wait"])?;
        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(challenge.expires_in_secs) + WAIT_REQUEST_SLACK)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        expect_success(response).await.map(|_| ())
    }

    async fn list_dialogs(&self) -> Result<Vec<Dialog>, PlatformError> {
        let url = self.session_url(&["dialogs"])?;
        self.get_json(url).await
    }

    fn messages_oldest_first<'a>(&'a self, conversation: &ConversationHandle) -> MessageStream<'a> {
        let peer = conversation.peer.clone();
        stream::try_unfold(Some(0_i64), move |cursor| {
            let peer = peer.clone();
            async move { self.next_page(&peer, cursor).await }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }

    async fn forward_message(
        &self,
        source: &ConversationHandle,
        destination: &ConversationHandle,
        message_id: i64,
    ) -> Result<(), PlatformError> {
        let url = self.session_url(&["forward"])?;
        let response = self
            .client
            .post(url)
            .json(&ForwardRequest {
                from_peer: &source.peer,
                to_peer: &destination.peer,
                message_id,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        expect_success(response).await.map(|_| ())
    }

    async fn export_session(&self) -> Option<String> {
        let url = self.session_url(&["export"]).ok()?;
        match self.get_json::<ExportResponse>(url).await {
            Ok(body) => body.session,
            Err(err) => {
                migrator_debug!("session export unavailable: {}", err);
                None
            }
        }
    }

    async fn disconnect(&self) {
        let Ok(url) = self.session_url(&[]) else {
            return;
        };
        if let Err(err) = self.client.delete(url).send().await {
            migrator_debug!("disconnect request failed: {}", err);
        }
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, PlatformError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            PlatformError::new(
                PlatformErrorKind::Protocol,
                format!("bridge url {base} cannot carry a path"),
            )
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_from_status(status, &body))
}

/// Maps a non-success bridge response to the platform error taxonomy.
///
/// The body's `error` field, or the raw body when it is not JSON, becomes the
/// message so rate-limit waits and rejection reasons reach the caller verbatim.
pub fn error_from_status(status: StatusCode, body: &str) -> PlatformError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body.trim().to_string(),
    };
    let kind = match status.as_u16() {
        401 | 403 => PlatformErrorKind::Unauthorized,
        404 => PlatformErrorKind::NotFound,
        408 | 410 => PlatformErrorKind::Expired,
        420 | 429 => PlatformErrorKind::RateLimited,
        502 | 503 => PlatformErrorKind::ConnectionLost,
        504 => PlatformErrorKind::Timeout,
        _ => PlatformErrorKind::Other,
    };
    PlatformError::new(kind, message)
}

fn map_reqwest_error(err: reqwest::Error) -> PlatformError {
    // A timed-out request is also a request error; check it first.
    if err.is_timeout() {
        return PlatformError::new(PlatformErrorKind::Timeout, err.to_string());
    }
    if err.is_connect() || err.is_request() {
        return PlatformError::connection_lost(err.to_string());
    }
    if err.is_decode() || err.is_body() {
        return PlatformError::new(PlatformErrorKind::Protocol, err.to_string());
    }
    PlatformError::new(PlatformErrorKind::Other, err.to_string())
}
