//! Scriptable in-memory client for tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_models::{ChatId, SessionIdentity};
use url::Url;

use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, EventSink};
use crate::traits::{Chat, ClientFactory, WhatsAppClient};
use crate::types::{ClientInfo, Contact, MediaPayload, OutgoingContent, RawMessage, SentMessage};

/// A call recorded by [`FakeClient`] or [`FakeChat`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Destroy,
    Send {
        chat_id: ChatId,
        content: OutgoingContent,
    },
    ChatSend {
        chat_id: ChatId,
        content: OutgoingContent,
    },
    GetChat(ChatId),
    ChatState {
        chat_id: ChatId,
        state: &'static str,
    },
    DownloadMedia(String),
    GetContact(String),
    FetchMedia(Url),
    GetNumberId(String),
    TakeOver,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<Call>,
    send_failures: VecDeque<ClientError>,
    chat_send_failures: VecDeque<ClientError>,
    connect_failure: Option<String>,
    chats: HashSet<ChatId>,
    contacts: HashMap<String, Contact>,
    media: HashMap<String, MediaPayload>,
    remote_media: Option<MediaPayload>,
    numbers: Option<HashMap<String, ChatId>>,
    info: ClientInfo,
    sent: usize,
}

/// In-memory [`WhatsAppClient`] that records every call.
#[derive(Clone)]
pub struct FakeClient {
    script: Arc<Mutex<Script>>,
    events: Option<EventSink>,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClient {
    /// Creates a fake with the account `15550000000@c.us` ("Bot").
    pub fn new() -> Self {
        let script = Script {
            info: ClientInfo {
                wid: "15550000000@c.us".to_string(),
                pushname: Some("Bot".to_string()),
            },
            ..Script::default()
        };
        Self {
            script: Arc::new(Mutex::new(script)),
            events: None,
        }
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut script)
    }

    /// Returns a copy sharing this fake's script, bound to an event sink.
    pub fn bound(&self, events: EventSink) -> Self {
        Self {
            script: self.script.clone(),
            events: Some(events),
        }
    }

    /// Emits an event through the bound sink, as the real client would.
    pub fn emit(&self, event: ClientEvent) -> bool {
        self.events.as_ref().is_some_and(|sink| sink.emit(event))
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<Call> {
        self.with_script(|s| s.calls.clone())
    }

    /// Returns the recorded direct and chat-object sends.
    pub fn sends(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Send { .. } | Call::ChatSend { .. }))
            .collect()
    }

    /// Makes the next direct send fail with `error`.
    pub fn fail_next_send(&self, error: ClientError) {
        self.with_script(|s| s.send_failures.push_back(error));
    }

    /// Makes the next chat-object send fail with `error`.
    pub fn fail_next_chat_send(&self, error: ClientError) {
        self.with_script(|s| s.chat_send_failures.push_back(error));
    }

    /// Makes the next `connect` fail.
    pub fn fail_connect(&self, message: &str) {
        self.with_script(|s| s.connect_failure = Some(message.to_string()));
    }

    /// Registers a chat resolvable through `get_chat_by_id`.
    pub fn add_chat(&self, chat_id: impl Into<ChatId>) {
        self.with_script(|s| {
            s.chats.insert(chat_id.into());
        });
    }

    /// Registers a contact.
    pub fn add_contact(&self, contact_id: &str, contact: Contact) {
        self.with_script(|s| {
            s.contacts.insert(contact_id.to_string(), contact);
        });
    }

    /// Registers downloadable media for a message ID.
    pub fn add_media(&self, message_id: &str, media: MediaPayload) {
        self.with_script(|s| {
            s.media.insert(message_id.to_string(), media);
        });
    }

    /// Sets what `fetch_media` returns.
    pub fn set_remote_media(&self, media: MediaPayload) {
        self.with_script(|s| s.remote_media = Some(media));
    }

    /// Enables number lookup and registers a number.
    pub fn add_number(&self, number: &str, chat_id: impl Into<ChatId>) {
        self.with_script(|s| {
            s.numbers
                .get_or_insert_with(HashMap::new)
                .insert(number.to_string(), chat_id.into());
        });
    }

    fn record(&self, call: Call) {
        self.with_script(|s| s.calls.push(call));
    }

    fn next_message_id(&self) -> String {
        self.with_script(|s| {
            s.sent += 1;
            format!("fake-{}", s.sent)
        })
    }
}

#[async_trait]
impl WhatsAppClient for FakeClient {
    async fn connect(&self) -> Result<()> {
        self.record(Call::Connect);
        match self.with_script(|s| s.connect_failure.take()) {
            Some(message) => Err(ClientError::Http(message)),
            None => Ok(()),
        }
    }

    async fn destroy(&self) -> Result<()> {
        self.record(Call::Destroy);
        Ok(())
    }

    async fn info(&self) -> Result<ClientInfo> {
        Ok(self.with_script(|s| s.info.clone()))
    }

    async fn send_message(
        &self,
        chat_id: &ChatId,
        content: &OutgoingContent,
    ) -> Result<SentMessage> {
        self.record(Call::Send {
            chat_id: chat_id.clone(),
            content: content.clone(),
        });
        if let Some(error) = self.with_script(|s| s.send_failures.pop_front()) {
            return Err(error);
        }
        Ok(SentMessage {
            message_id: self.next_message_id(),
        })
    }

    async fn get_chat_by_id(&self, chat_id: &ChatId) -> Result<Option<Arc<dyn Chat>>> {
        self.record(Call::GetChat(chat_id.clone()));
        if self.with_script(|s| s.chats.contains(chat_id)) {
            Ok(Some(Arc::new(FakeChat {
                id: chat_id.clone(),
                client: self.clone(),
            })))
        } else {
            Ok(None)
        }
    }

    async fn download_media(&self, message: &RawMessage) -> Result<Option<MediaPayload>> {
        self.record(Call::DownloadMedia(message.id.clone()));
        Ok(self.with_script(|s| s.media.get(&message.id).cloned()))
    }

    async fn get_contact(&self, contact_id: &str) -> Result<Contact> {
        self.record(Call::GetContact(contact_id.to_string()));
        self.with_script(|s| s.contacts.get(contact_id).cloned())
            .ok_or_else(|| ClientError::Protocol(format!("unknown contact {}", contact_id)))
    }

    async fn fetch_media(&self, url: &Url) -> Result<MediaPayload> {
        self.record(Call::FetchMedia(url.clone()));
        self.with_script(|s| s.remote_media.clone())
            .ok_or_else(|| ClientError::Http(format!("404 fetching {}", url)))
    }

    async fn get_number_id(&self, number: &str) -> Result<Option<ChatId>> {
        self.record(Call::GetNumberId(number.to_string()));
        self.with_script(|s| {
            s.numbers
                .as_ref()
                .map(|numbers| numbers.get(number).cloned())
                .ok_or(ClientError::Unsupported("number lookup"))
        })
    }

    async fn take_over(&self) -> Result<()> {
        self.record(Call::TakeOver);
        Ok(())
    }
}

/// Chat object handed out by [`FakeClient`].
pub struct FakeChat {
    id: ChatId,
    client: FakeClient,
}

impl FakeChat {
    fn state(&self, state: &'static str) {
        self.client.record(Call::ChatState {
            chat_id: self.id.clone(),
            state,
        });
    }
}

#[async_trait]
impl Chat for FakeChat {
    fn id(&self) -> &ChatId {
        &self.id
    }

    async fn send_message(&self, content: &OutgoingContent) -> Result<SentMessage> {
        self.client.record(Call::ChatSend {
            chat_id: self.id.clone(),
            content: content.clone(),
        });
        if let Some(error) = self.client.with_script(|s| s.chat_send_failures.pop_front()) {
            return Err(error);
        }
        Ok(SentMessage {
            message_id: self.client.next_message_id(),
        })
    }

    async fn send_state_typing(&self) -> Result<()> {
        self.state("typing");
        Ok(())
    }

    async fn send_state_recording(&self) -> Result<()> {
        self.state("recording");
        Ok(())
    }

    async fn clear_state(&self) -> Result<()> {
        self.state("clear");
        Ok(())
    }
}

/// Factory handing out [`FakeClient`]s that share one script.
#[derive(Clone, Default)]
pub struct FakeFactory {
    client: FakeClient,
    created: Arc<AtomicUsize>,
    bound: Arc<Mutex<Vec<FakeClient>>>,
    data_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeFactory {
    /// Creates a factory around a shared fake.
    pub fn new(client: FakeClient) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// The shared fake (for scripting and call inspection).
    pub fn client(&self) -> &FakeClient {
        &self.client
    }

    /// Number of instances created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// The most recently created instance, bound to its event sink.
    pub fn latest(&self) -> Option<FakeClient> {
        self.bound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// Instance number `index` (0-based), bound to its event sink.
    pub fn instance(&self, index: usize) -> Option<FakeClient> {
        self.bound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    /// Data directories instances were created with.
    pub fn data_dirs(&self) -> Vec<PathBuf> {
        self.data_dirs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create(
        &self,
        _identity: &SessionIdentity,
        data_dir: &Path,
        events: EventSink,
    ) -> Result<Arc<dyn WhatsAppClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let client = self.client.bound(events);
        self.bound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(client.clone());
        self.data_dirs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(data_dir.to_path_buf());
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_scripted_send_failure_then_success() {
        let client = FakeClient::new();
        client.fail_next_send(ClientError::Send("boom".to_string()));
        let chat = ChatId::from("1@c.us");
        let text = OutgoingContent::Text("hi".to_string());

        assert!(client.send_message(&chat, &text).await.is_err());
        let sent = client.send_message(&chat, &text).await.unwrap();

        assert_eq!(sent.message_id, "fake-1");
        assert_eq!(client.sends().len(), 2);
    }

    #[tokio::test]
    async fn test_factory_binds_sinks() {
        let factory = FakeFactory::new(FakeClient::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let identity = SessionIdentity::new("bot").unwrap();

        factory
            .create(&identity, Path::new("/tmp/x"), EventSink::new(4, tx))
            .await
            .unwrap();

        assert_eq!(factory.created(), 1);
        assert!(factory.latest().unwrap().emit(ClientEvent::Ready));
        assert_eq!(rx.recv().await.unwrap().generation, 4);
    }

    #[tokio::test]
    async fn test_number_lookup_unsupported_until_scripted() {
        let client = FakeClient::new();
        assert!(matches!(
            client.get_number_id("1555").await,
            Err(ClientError::Unsupported(_))
        ));

        client.add_number("1555", "1555@c.us");
        assert_eq!(
            client.get_number_id("1555").await.unwrap(),
            Some(ChatId::from("1555@c.us"))
        );
        assert_eq!(client.get_number_id("999").await.unwrap(), None);
    }
}
