//! Core traits for the client capability.
//!
//! The relay never talks to WhatsApp directly. It drives an implementation
//! of these traits and reacts to the [`ClientEvent`](crate::ClientEvent)s the
//! implementation pushes into its [`EventSink`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use relay_models::{ChatId, SessionIdentity};
use url::Url;

use crate::error::{ClientError, Result};
use crate::event::EventSink;
use crate::types::{ClientInfo, Contact, MediaPayload, OutgoingContent, RawMessage, SentMessage};

/// A live client instance bound to one session identity.
///
/// # Example
///
/// ```ignore
/// use relay_client::{OutgoingContent, WhatsAppClient};
/// use relay_models::ChatId;
///
/// async fn greet(client: &dyn WhatsAppClient) -> relay_client::Result<()> {
///     let chat = ChatId::personal("5511999999999");
///     let sent = client
///         .send_message(&chat, &OutgoingContent::Text("hello".into()))
///         .await?;
///     println!("sent {}", sent.message_id);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait WhatsAppClient: Send + Sync {
    /// Starts the login handshake. Progress is reported through events.
    async fn connect(&self) -> Result<()>;

    /// Tears the instance down and releases its resources.
    async fn destroy(&self) -> Result<()>;

    /// The account's own identity.
    async fn info(&self) -> Result<ClientInfo>;

    /// Sends content to a chat.
    async fn send_message(&self, chat_id: &ChatId, content: &OutgoingContent)
        -> Result<SentMessage>;

    /// Resolves a chat object, or `None` when the chat is unknown.
    async fn get_chat_by_id(&self, chat_id: &ChatId) -> Result<Option<Arc<dyn Chat>>>;

    /// Downloads the media attached to a message.
    async fn download_media(&self, message: &RawMessage) -> Result<Option<MediaPayload>>;

    /// Looks up a contact by WhatsApp ID.
    async fn get_contact(&self, contact_id: &str) -> Result<Contact>;

    /// Fetches remote media so it can be attached to a message.
    async fn fetch_media(&self, url: &Url) -> Result<MediaPayload>;

    /// Resolves a bare number to its registered chat ID.
    ///
    /// `Ok(None)` means the number is not on WhatsApp.
    async fn get_number_id(&self, _number: &str) -> Result<Option<ChatId>> {
        Err(ClientError::Unsupported("number lookup"))
    }

    /// Takes the session over from another device ("use here").
    async fn take_over(&self) -> Result<()> {
        Err(ClientError::Unsupported("take over"))
    }
}

/// A resolved chat.
#[async_trait]
pub trait Chat: Send + Sync {
    /// The chat's ID.
    fn id(&self) -> &ChatId;

    /// Sends content through this chat object.
    async fn send_message(&self, content: &OutgoingContent) -> Result<SentMessage>;

    /// Shows "typing..." to the other party.
    async fn send_state_typing(&self) -> Result<()>;

    /// Shows "recording audio..." to the other party.
    async fn send_state_recording(&self) -> Result<()>;

    /// Clears any presence state.
    async fn clear_state(&self) -> Result<()>;
}

/// Builds client instances.
///
/// Called once per start; the returned instance pushes its events into `events`.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        identity: &SessionIdentity,
        data_dir: &Path,
        events: EventSink,
    ) -> Result<Arc<dyn WhatsAppClient>>;
}
