//! RemoteEngine -- [`ClientEngine`] driver for an external engine daemon.
//!
//! The daemon owns the real chat-network connection and exposes it as a
//! small per-session REST surface plus an SSE feed of lifecycle events at
//! `/events`. This driver forwards operations over HTTP and pumps the SSE
//! feed into the session's event channel.
//!
//! The daemon API key is wrapped in [`secrecy::SecretString`] and is never
//! logged or included in `Debug` output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest_eventsource::{Event, EventSource};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use wagate_core::engine::{ClientEngine, EngineEvent};
use wagate_types::config::RemoteEngineConfig;
use wagate_types::contact::{Contact, ContactsPaginationParams, NumberExistResult};
use wagate_types::error::EngineError;
use wagate_types::presence::{PresenceInfo, SetPresenceRequest};
use wagate_types::session::SessionConfig;
use wagate_types::status::{
    DeleteStatusRequest, ImageStatus, SentStatus, TextStatus, VideoStatus, VoiceStatus,
};

/// Per-operation timeout against the daemon. Engine calls must never block
/// a tenant request indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle event as the daemon serializes it on the SSE feed.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RemoteEvent {
    ScanRequired { code: String },
    Authenticated,
    Disconnected { fatal: bool, reason: String },
}

impl From<RemoteEvent> for EngineEvent {
    fn from(event: RemoteEvent) -> Self {
        match event {
            RemoteEvent::ScanRequired { code } => EngineEvent::ScanRequired { code },
            RemoteEvent::Authenticated => EngineEvent::Authenticated,
            RemoteEvent::Disconnected { fatal, reason } => {
                EngineEvent::Disconnected { fatal, reason }
            }
        }
    }
}

/// HTTP + SSE driver for one session on an external engine daemon.
#[derive(Debug)]
pub struct RemoteEngine {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    session: String,
    /// Session-level flag: log every dispatched operation at debug level.
    debug: bool,
    closed: AtomicBool,
    events_task: JoinHandle<()>,
}

impl RemoteEngine {
    /// Connect a session to the daemon and start pumping its SSE feed into
    /// `events`.
    ///
    /// The session config's `proxy` routes all daemon traffic through the
    /// given proxy URL; `debug` turns on per-operation logging.
    pub fn connect(
        config: &RemoteEngineConfig,
        session_config: &SessionConfig,
        session: &str,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<Self, EngineError> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(proxy) = &session_config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| EngineError::Fatal(format!("invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| EngineError::Fatal(format!("failed to build HTTP client: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let api_key: Option<SecretString> =
            config.api_key.as_deref().map(SecretString::from);

        let events_task = spawn_event_feed(
            client.clone(),
            format!("{base_url}/api/{session}/events"),
            api_key.clone(),
            session.to_string(),
            events,
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            session: session.to_string(),
            debug: session_config.debug,
            closed: AtomicBool::new(false),
            events_task,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}{}", self.base_url, self.session, path)
    }

    /// Per-operation preamble: reject dispatch on a closed connection and
    /// honor the session's debug flag.
    fn begin(&self, op: &'static str) -> Result<(), EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Fatal("engine connection closed".to_string()));
        }
        if self.debug {
            debug!(session = %self.session, op, "dispatching to daemon");
        }
        Ok(())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("x-api-key", key.expose_secret()),
            None => request,
        }
    }

    /// Issue a request and decode the JSON response body.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, EngineError> {
        let response = check_response(self.authorize(request).send().await).await?;
        response
            .json()
            .await
            .map_err(|e| EngineError::Retryable(format!("failed to parse daemon response: {e}")))
    }

    /// Issue a request where only success/failure matters.
    async fn execute_unit(&self, request: reqwest::RequestBuilder) -> Result<(), EngineError> {
        check_response(self.authorize(request).send().await).await?;
        Ok(())
    }

    /// Issue a lookup where the daemon signals privacy denial or absence
    /// with 403/404; both decode to `Ok(None)`.
    async fn execute_optional<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, EngineError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        match response.status() {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            _ => {
                let response = check_response(Ok(response)).await?;
                response.json().await.map(Some).map_err(|e| {
                    EngineError::Retryable(format!("failed to parse daemon response: {e}"))
                })
            }
        }
    }
}

impl ClientEngine for RemoteEngine {
    fn kind(&self) -> &str {
        "remote"
    }

    async fn get_contacts(
        &self,
        pagination: &ContactsPaginationParams,
    ) -> Result<Vec<Contact>, EngineError> {
        self.begin("get_contacts")?;
        let mut request = self.client.get(self.url("/contacts"));
        if let Some(limit) = pagination.limit {
            request = request.query(&[("limit", limit)]);
        }
        if let Some(offset) = pagination.offset {
            request = request.query(&[("offset", offset)]);
        }
        if let Some(sort_by) = &pagination.sort_by {
            request = request.query(&[("sortBy", sort_by)]);
        }
        self.execute(request).await
    }

    async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, EngineError> {
        self.begin("get_contact")?;
        let request = self
            .client
            .get(self.url("/contacts/one"))
            .query(&[("contactId", contact_id)]);
        self.execute_optional(request).await
    }

    async fn check_number_exists(&self, phone: &str) -> Result<NumberExistResult, EngineError> {
        self.begin("check_number_exists")?;
        let request = self
            .client
            .get(self.url("/contacts/check-exists"))
            .query(&[("phone", phone)]);
        self.execute(request).await
    }

    async fn get_contact_about(&self, contact_id: &str) -> Result<Option<String>, EngineError> {
        self.begin("get_contact_about")?;
        #[derive(Deserialize)]
        struct About {
            about: Option<String>,
        }
        let request = self
            .client
            .get(self.url("/contacts/about"))
            .query(&[("contactId", contact_id)]);
        let about: Option<About> = self.execute_optional(request).await?;
        Ok(about.and_then(|a| a.about))
    }

    async fn get_profile_picture(
        &self,
        contact_id: &str,
        refresh: bool,
    ) -> Result<Option<String>, EngineError> {
        self.begin("get_profile_picture")?;
        #[derive(Deserialize)]
        struct Picture {
            url: Option<String>,
        }
        let request = self
            .client
            .get(self.url("/contacts/profile-picture"))
            .query(&[("contactId", contact_id)])
            .query(&[("refresh", refresh)]);
        let picture: Option<Picture> = self.execute_optional(request).await?;
        Ok(picture.and_then(|p| p.url))
    }

    async fn block_contact(&self, contact_id: &str) -> Result<(), EngineError> {
        self.begin("block_contact")?;
        let request = self
            .client
            .post(self.url("/contacts/block"))
            .json(&serde_json::json!({ "contactId": contact_id }));
        self.execute_unit(request).await
    }

    async fn unblock_contact(&self, contact_id: &str) -> Result<(), EngineError> {
        self.begin("unblock_contact")?;
        let request = self
            .client
            .post(self.url("/contacts/unblock"))
            .json(&serde_json::json!({ "contactId": contact_id }));
        self.execute_unit(request).await
    }

    async fn send_text_status(&self, status: &TextStatus) -> Result<SentStatus, EngineError> {
        self.begin("send_text_status")?;
        self.execute(self.client.post(self.url("/status/text")).json(status))
            .await
    }

    async fn send_image_status(&self, status: &ImageStatus) -> Result<SentStatus, EngineError> {
        self.begin("send_image_status")?;
        self.execute(self.client.post(self.url("/status/image")).json(status))
            .await
    }

    async fn send_voice_status(&self, status: &VoiceStatus) -> Result<SentStatus, EngineError> {
        self.begin("send_voice_status")?;
        self.execute(self.client.post(self.url("/status/voice")).json(status))
            .await
    }

    async fn send_video_status(&self, status: &VideoStatus) -> Result<SentStatus, EngineError> {
        self.begin("send_video_status")?;
        self.execute(self.client.post(self.url("/status/video")).json(status))
            .await
    }

    async fn delete_status(&self, request: &DeleteStatusRequest) -> Result<(), EngineError> {
        self.begin("delete_status")?;
        self.execute_unit(self.client.post(self.url("/status/delete")).json(request))
            .await
    }

    async fn set_presence(&self, request: &SetPresenceRequest) -> Result<(), EngineError> {
        self.begin("set_presence")?;
        self.execute_unit(self.client.post(self.url("/presence")).json(request))
            .await
    }

    async fn get_presence(&self, contact_id: &str) -> Result<PresenceInfo, EngineError> {
        self.begin("get_presence")?;
        let request = self
            .client
            .get(self.url("/presence"))
            .query(&[("contactId", contact_id)]);
        self.execute(request).await
    }

    async fn subscribe_presence(&self, contact_id: &str) -> Result<(), EngineError> {
        self.begin("subscribe_presence")?;
        let request = self
            .client
            .post(self.url("/presence/subscribe"))
            .json(&serde_json::json!({ "contactId": contact_id }));
        self.execute_unit(request).await
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.events_task.abort();
        // Best effort: tell the daemon to release the network connection.
        let request = self.authorize(self.client.post(self.url("/stop")));
        if let Err(err) = request.send().await {
            debug!(session = %self.session, "daemon stop request failed: {err}");
        }
    }
}

// RemoteEngine intentionally does NOT derive Debug so the API key can never
// leak through debug formatting.

/// Map a reqwest transport failure (connect, timeout, DNS) to an engine
/// error. Transport failures are always retryable; the daemon may come back.
fn map_transport_error(err: reqwest::Error) -> EngineError {
    EngineError::Retryable(format!("daemon request failed: {err}"))
}

/// Classify a non-success daemon status code.
///
/// 401/403/410 mean the daemon rejected this session permanently; everything
/// else is worth retrying.
fn classify_status(status: StatusCode, body: &str) -> EngineError {
    match status.as_u16() {
        401 | 403 | 410 => EngineError::Fatal(format!("daemon rejected session: HTTP {status}: {body}")),
        _ => EngineError::Retryable(format!("daemon error: HTTP {status}: {body}")),
    }
}

async fn check_response(
    result: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, EngineError> {
    let response = result.map_err(map_transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Pump the daemon's SSE feed into the session's event channel.
///
/// Runs until the event channel closes (session stopped or superseded) or
/// the feed ends. Feed-level failures surface as a retryable `Disconnected`
/// so the session stays up while the daemon reconnects.
fn spawn_event_feed(
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
    session: String,
    events: mpsc::Sender<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut request = client.get(&url);
        if let Some(key) = &api_key {
            request = request.header("x-api-key", key.expose_secret());
        }
        let mut feed = match EventSource::new(request) {
            Ok(feed) => feed,
            Err(err) => {
                warn!(session = %session, "failed to open event feed: {err}");
                let _ = events
                    .send(EngineEvent::Disconnected {
                        fatal: true,
                        reason: format!("event feed unavailable: {err}"),
                    })
                    .await;
                return;
            }
        };

        while let Some(event) = feed.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!(session = %session, "event feed connected");
                }
                Ok(Event::Message(message)) => {
                    match serde_json::from_str::<RemoteEvent>(&message.data) {
                        Ok(remote) => {
                            if events.send(remote.into()).await.is_err() {
                                // Session stopped; nobody is listening.
                                return;
                            }
                        }
                        Err(err) => {
                            warn!(session = %session, "unparseable daemon event: {err}");
                        }
                    }
                }
                Err(err) => {
                    warn!(session = %session, "event feed error: {err}");
                    let _ = events
                        .send(EngineEvent::Disconnected {
                            fatal: false,
                            reason: format!("event feed dropped: {err}"),
                        })
                        .await;
                    // EventSource reconnects internally; keep polling.
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_event_parses_tagged_json() {
        let event: RemoteEvent =
            serde_json::from_str(r#"{"type":"scan_required","code":"qr-data"}"#).unwrap();
        assert!(matches!(
            EngineEvent::from(event),
            EngineEvent::ScanRequired { code } if code == "qr-data"
        ));

        let event: RemoteEvent = serde_json::from_str(r#"{"type":"authenticated"}"#).unwrap();
        assert_eq!(EngineEvent::from(event), EngineEvent::Authenticated);

        let event: RemoteEvent = serde_json::from_str(
            r#"{"type":"disconnected","fatal":true,"reason":"logged out"}"#,
        )
        .unwrap();
        assert!(matches!(
            EngineEvent::from(event),
            EngineEvent::Disconnected { fatal: true, .. }
        ));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::UNAUTHORIZED, "").is_fatal());
        assert!(classify_status(StatusCode::GONE, "").is_fatal());
        assert!(!classify_status(StatusCode::INTERNAL_SERVER_ERROR, "").is_fatal());
        assert!(!classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_fatal());
    }

    fn daemon_config() -> RemoteEngineConfig {
        RemoteEngineConfig {
            base_url: "http://127.0.0.1:3100/".to_string(),
            api_key: None,
        }
    }

    #[tokio::test]
    async fn test_connect_trims_trailing_slash() {
        let (tx, _rx) = mpsc::channel(8);
        let engine =
            RemoteEngine::connect(&daemon_config(), &SessionConfig::default(), "alice", tx)
                .unwrap();
        assert_eq!(engine.url("/contacts"), "http://127.0.0.1:3100/api/alice/contacts");
        engine.events_task.abort();
    }

    #[tokio::test]
    async fn test_connect_applies_session_proxy_and_debug() {
        let (tx, _rx) = mpsc::channel(8);
        let session_config = SessionConfig {
            proxy: Some("http://127.0.0.1:8888".to_string()),
            debug: true,
            ..SessionConfig::default()
        };
        let engine =
            RemoteEngine::connect(&daemon_config(), &session_config, "alice", tx).unwrap();
        assert!(engine.debug);
        engine.events_task.abort();
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_proxy_url() {
        let (tx, _rx) = mpsc::channel(8);
        let session_config = SessionConfig {
            proxy: Some("http://[not-a-proxy".to_string()),
            ..SessionConfig::default()
        };
        let err = RemoteEngine::connect(&daemon_config(), &session_config, "alice", tx)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
