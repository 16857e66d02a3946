//! HTTP client for the browser sidecar.
//!
//! The sidecar hosts the WhatsApp Web session and exposes it under
//! `/sessions/{id}/...`. Events are pulled from a sequenced feed by a
//! background poller and pushed into the instance's [`EventSink`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use relay_models::{ChatId, SessionIdentity};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::time::interval;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, EventSink};
use crate::traits::{Chat, ClientFactory, WhatsAppClient};
use crate::types::{
    ClientInfo, Contact, MediaPayload, OutgoingContent, RawMessage, SentMessage,
};

/// Default interval between event feed polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct StartRequest<'a> {
    data_dir: &'a Path,
}

#[derive(Deserialize)]
struct SequencedEvent {
    seq: u64,
    event: ClientEvent,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent<'a> {
    Text {
        body: &'a str,
    },
    Media {
        mimetype: &'a str,
        data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<&'a str>,
        send_audio_as_voice: bool,
    },
}

impl<'a> From<&'a OutgoingContent> for WireContent<'a> {
    fn from(content: &'a OutgoingContent) -> Self {
        match content {
            OutgoingContent::Text(body) => WireContent::Text { body },
            OutgoingContent::Media { media, options } => WireContent::Media {
                mimetype: &media.mime_type,
                data: STANDARD.encode(&media.data),
                filename: options.filename.as_deref().or(media.filename.as_deref()),
                caption: options.caption.as_deref(),
                send_audio_as_voice: options.send_audio_as_voice,
            },
        }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_id: Option<&'a str>,
    content: WireContent<'a>,
}

#[derive(Serialize)]
struct StateRequest<'a> {
    state: &'a str,
}

#[derive(Deserialize)]
struct WireMedia {
    mimetype: String,
    data: String,
    #[serde(default)]
    filename: Option<String>,
}

impl WireMedia {
    fn decode(self) -> Result<MediaPayload> {
        let data = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ClientError::Protocol(format!("invalid media encoding: {}", e)))?;
        Ok(MediaPayload {
            mime_type: self.mimetype,
            data,
            filename: self.filename,
        })
    }
}

#[derive(Deserialize)]
struct NumberLookup {
    #[serde(default, alias = "chat_id")]
    id: Option<String>,
}

/// Shared HTTP plumbing for one session.
#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    session_url: String,
}

impl Endpoint {
    fn new(http: reqwest::Client, base_url: &Url, identity: &SessionIdentity) -> Self {
        Self {
            http,
            session_url: format!(
                "{}/sessions/{}",
                base_url.as_str().trim_end_matches('/'),
                identity
            ),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.session_url.clone()
        } else {
            format!("{}/{}", self.session_url, path)
        }
    }
}

/// Turns a non-success response into an error.
///
/// 404 answers carry "no chat found" semantics; everything else is mapped by
/// `other`.
async fn check(response: Response, other: fn(String) -> ClientError) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        body
    };
    if status == StatusCode::NOT_FOUND {
        Err(ClientError::ChatNotFound(detail))
    } else {
        Err(other(detail))
    }
}

/// A client instance backed by the sidecar.
pub struct SidecarClient {
    endpoint: Endpoint,
    data_dir: PathBuf,
    events: EventSink,
    poll_interval: Duration,
    shutdown: watch::Sender<bool>,
    poller: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SidecarClient {
    /// Creates a client for one session. Nothing is sent until [`connect`](WhatsAppClient::connect).
    pub fn new(
        http: reqwest::Client,
        base_url: &Url,
        identity: &SessionIdentity,
        data_dir: &Path,
        events: EventSink,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            endpoint: Endpoint::new(http, base_url, identity),
            data_dir: data_dir.to_path_buf(),
            events,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown,
            poller: Mutex::new(None),
        }
    }

    /// Sets the event feed poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn stop_poller(&self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.poller.lock().await.take() {
            let _ = handle.await;
        }
    }
}

/// Pulls the sequenced event feed until shutdown or until the sink closes.
async fn poll_events(
    endpoint: Endpoint,
    events: EventSink,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    let mut after = 0u64;
    let feed = endpoint.url("events");

    debug!(
        generation = events.generation(),
        poll_interval_ms = poll_interval.as_millis(),
        "starting event poller"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let batch = match endpoint
            .http
            .get(&feed)
            .query(&[("after", after)])
            .send()
            .await
        {
            Ok(response) => match check(response, ClientError::Http).await {
                Ok(response) => response.json::<Vec<SequencedEvent>>().await,
                Err(e) => {
                    warn!(error = %e, "event feed rejected poll");
                    continue;
                }
            },
            Err(e) => {
                warn!(error = %e, "event feed unreachable");
                continue;
            }
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "malformed event batch");
                continue;
            }
        };

        trace!(count = batch.len(), after, "polled events");
        for item in batch {
            if item.seq <= after {
                continue;
            }
            after = item.seq;
            if !events.emit(item.event) {
                debug!("event sink closed, stopping poller");
                return;
            }
        }
    }

    debug!(generation = events.generation(), "event poller stopped");
}

#[async_trait]
impl WhatsAppClient for SidecarClient {
    async fn connect(&self) -> Result<()> {
        let response = self
            .endpoint
            .http
            .post(self.endpoint.url("start"))
            .json(&StartRequest {
                data_dir: &self.data_dir,
            })
            .send()
            .await?;
        check(response, ClientError::Http).await?;

        let mut poller = self.poller.lock().await;
        if poller.is_none() {
            *poller = Some(tokio::spawn(poll_events(
                self.endpoint.clone(),
                self.events.clone(),
                self.poll_interval,
                self.shutdown.subscribe(),
            )));
        }
        info!(session = %self.endpoint.session_url, "sidecar session started");
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.stop_poller().await;
        let response = self
            .endpoint
            .http
            .delete(self.endpoint.url(""))
            .send()
            .await?;
        match check(response, ClientError::Http).await {
            Ok(_) | Err(ClientError::ChatNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn info(&self) -> Result<ClientInfo> {
        let response = self
            .endpoint
            .http
            .get(self.endpoint.url("info"))
            .send()
            .await?;
        let response = check(response, ClientError::Http).await.map_err(|e| match e {
            ClientError::ChatNotFound(_) => ClientError::NotRunning,
            other => other,
        })?;
        Ok(response.json().await?)
    }

    async fn send_message(
        &self,
        chat_id: &ChatId,
        content: &OutgoingContent,
    ) -> Result<SentMessage> {
        let response = self
            .endpoint
            .http
            .post(self.endpoint.url("messages"))
            .json(&SendRequest {
                chat_id: Some(chat_id.as_str()),
                content: content.into(),
            })
            .send()
            .await
            .map_err(|e| ClientError::Send(e.to_string()))?;
        let response = check(response, ClientError::Send).await?;
        Ok(response.json().await?)
    }

    async fn get_chat_by_id(&self, chat_id: &ChatId) -> Result<Option<Arc<dyn Chat>>> {
        let chat_url = self.endpoint.url(&format!("chats/{}", chat_id));
        let response = self.endpoint.http.get(&chat_url).send().await?;
        match check(response, ClientError::Http).await {
            Ok(_) => Ok(Some(Arc::new(SidecarChat {
                http: self.endpoint.http.clone(),
                chat_url,
                id: chat_id.clone(),
            }))),
            Err(ClientError::ChatNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn download_media(&self, message: &RawMessage) -> Result<Option<MediaPayload>> {
        let response = self
            .endpoint
            .http
            .get(self.endpoint.url(&format!("messages/{}/media", message.id)))
            .send()
            .await?;
        match check(response, ClientError::Http).await {
            Ok(response) => {
                let media: WireMedia = response.json().await?;
                media.decode().map(Some)
            }
            Err(ClientError::ChatNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_contact(&self, contact_id: &str) -> Result<Contact> {
        let response = self
            .endpoint
            .http
            .get(self.endpoint.url(&format!("contacts/{}", contact_id)))
            .send()
            .await?;
        let response = check(response, ClientError::Http).await?;
        Ok(response.json().await?)
    }

    async fn fetch_media(&self, url: &Url) -> Result<MediaPayload> {
        let response = self.endpoint.http.get(url.clone()).send().await?;
        let response = check(response, ClientError::Http).await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let data = response.bytes().await?.to_vec();

        debug!(url = %url, bytes = data.len(), mime_type = %mime_type, "fetched media");
        Ok(MediaPayload {
            mime_type,
            data,
            filename,
        })
    }

    async fn get_number_id(&self, number: &str) -> Result<Option<ChatId>> {
        let response = self
            .endpoint
            .http
            .get(self.endpoint.url(&format!("numbers/{}", number)))
            .send()
            .await?;
        match check(response, ClientError::Http).await {
            Ok(response) => {
                let lookup: NumberLookup = response.json().await?;
                Ok(lookup.id.map(ChatId::from_string))
            }
            Err(ClientError::ChatNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn take_over(&self) -> Result<()> {
        let response = self
            .endpoint
            .http
            .post(self.endpoint.url("take-over"))
            .send()
            .await?;
        check(response, ClientError::Http).await?;
        Ok(())
    }
}

/// A chat resolved through the sidecar.
struct SidecarChat {
    http: reqwest::Client,
    chat_url: String,
    id: ChatId,
}

impl SidecarChat {
    async fn set_state(&self, state: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/state", self.chat_url))
            .json(&StateRequest { state })
            .send()
            .await?;
        check(response, ClientError::Http).await?;
        Ok(())
    }
}

#[async_trait]
impl Chat for SidecarChat {
    fn id(&self) -> &ChatId {
        &self.id
    }

    async fn send_message(&self, content: &OutgoingContent) -> Result<SentMessage> {
        let response = self
            .http
            .post(format!("{}/messages", self.chat_url))
            .json(&SendRequest {
                chat_id: None,
                content: content.into(),
            })
            .send()
            .await
            .map_err(|e| ClientError::Send(e.to_string()))?;
        let response = check(response, ClientError::Send).await?;
        Ok(response.json().await?)
    }

    async fn send_state_typing(&self) -> Result<()> {
        self.set_state("typing").await
    }

    async fn send_state_recording(&self) -> Result<()> {
        self.set_state("recording").await
    }

    async fn clear_state(&self) -> Result<()> {
        self.set_state("clear").await
    }
}

/// Builds [`SidecarClient`]s sharing one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct SidecarFactory {
    http: reqwest::Client,
    base_url: Url,
    poll_interval: Duration,
}

impl SidecarFactory {
    /// Creates a factory for the sidecar at `base_url`.
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Sets the event feed poll interval for created clients.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the sidecar base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl ClientFactory for SidecarFactory {
    async fn create(
        &self,
        identity: &SessionIdentity,
        data_dir: &Path,
        events: EventSink,
    ) -> Result<Arc<dyn WhatsAppClient>> {
        debug!(identity = %identity, generation = events.generation(), "creating sidecar client");
        let client = SidecarClient::new(
            self.http.clone(),
            &self.base_url,
            identity,
            data_dir,
            events,
        )
        .with_poll_interval(self.poll_interval);
        Ok(Arc::new(client))
    }
}
