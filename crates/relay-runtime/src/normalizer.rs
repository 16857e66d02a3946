//! Inbound event normalizer.
//!
//! Turns a raw client message into a [`MessageEnvelope`], or drops it.

use std::fmt;

use relay_client::{RawMessage, WhatsAppClient};
use relay_models::{Content, EnvelopeBuilder, MediaKind, MessageEnvelope};
use relay_persistence::MediaStore;
use tracing::{debug, warn};

/// Message types that never carry chat content.
pub const ADMINISTRATIVE_TYPES: &[&str] = &[
    "call_log",
    "protocol",
    "revoked",
    "notification",
    "notification_template",
    "group_notification",
    "gp2",
    "e2e_notification",
    "ciphertext",
];

/// Message types carrying a plain text body.
const TEXT_TYPES: &[&str] = &["chat", "text"];

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    StatusBroadcast,
    Group,
    Administrative,
    NotConnected,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::StatusBroadcast => "status broadcast",
            DropReason::Group => "group chat",
            DropReason::Administrative => "administrative type",
            DropReason::NotConnected => "session not connected",
        };
        f.write_str(reason)
    }
}

/// Applies the filters in order; the first match drops the message.
pub fn drop_reason(message: &RawMessage, connected: bool) -> Option<DropReason> {
    if message.is_status_broadcast() {
        Some(DropReason::StatusBroadcast)
    } else if message.is_group_chat() {
        Some(DropReason::Group)
    } else if ADMINISTRATIVE_TYPES.contains(&message.message_type.as_str()) {
        Some(DropReason::Administrative)
    } else if !connected {
        Some(DropReason::NotConnected)
    } else {
        None
    }
}

/// Normalizes raw messages, storing their media on the way.
#[derive(Debug, Clone)]
pub struct InboundNormalizer {
    media: MediaStore,
}

impl InboundNormalizer {
    pub fn new(media: MediaStore) -> Self {
        Self { media }
    }

    /// Produces one envelope, or `None` when a filter drops the message.
    ///
    /// Account and contact lookups are best-effort and degrade to empty
    /// values.
    pub async fn normalize(
        &self,
        message: &RawMessage,
        client: &dyn WhatsAppClient,
        connected: bool,
    ) -> Option<MessageEnvelope> {
        if let Some(reason) = drop_reason(message, connected) {
            debug!(message_id = %message.id, reason = %reason, "message dropped");
            return None;
        }
        Some(self.build(message, client).await)
    }

    /// Builds the envelope for a message that already passed the filters.
    pub async fn build(
        &self,
        message: &RawMessage,
        client: &dyn WhatsAppClient,
    ) -> MessageEnvelope {
        let mut builder =
            EnvelopeBuilder::new(&message.id, &message.from, &message.to, message.from_me)
                .group(message.is_group_chat())
                .timestamp(message.timestamp)
                .message_type(&message.message_type);

        match client.info().await {
            Ok(info) => builder = builder.account(&info.wid, info.pushname.as_deref()),
            Err(e) => debug!(error = %e, "account info unavailable"),
        }

        match client.get_contact(message.chat_id()).await {
            Ok(contact) => builder = builder.contact_name(contact.display_name()),
            Err(e) => debug!(contact = message.chat_id(), error = %e, "contact lookup failed"),
        }

        let content = self.content(message, client).await;
        builder.build(content)
    }

    async fn content(&self, message: &RawMessage, client: &dyn WhatsAppClient) -> Content {
        if message.has_media {
            if let Some(content) = self.media_content(message, client).await {
                return content;
            }
        } else if TEXT_TYPES.contains(&message.message_type.as_str()) {
            return Content::Text {
                body: message.body.clone(),
            };
        }
        Content::Unknown {
            raw: message.to_value(),
        }
    }

    /// Downloads and stores the attachment. `None` when that failed.
    async fn media_content(
        &self,
        message: &RawMessage,
        client: &dyn WhatsAppClient,
    ) -> Option<Content> {
        let payload = match client.download_media(message).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!(message_id = %message.id, "media no longer available");
                return None;
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "media download failed");
                return None;
            }
        };

        let artifact = match self.media.store(&payload.mime_type, &payload.data) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "failed to store media");
                return None;
            }
        };

        let media_kind = MediaKind::from_message_type(&message.message_type);
        if media_kind == MediaKind::Other {
            warn!(
                message_id = %message.id,
                message_type = %message.message_type,
                "unhandled media type, tagging as other"
            );
        }

        let filename = message
            .filename
            .clone()
            .or(payload.filename)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| artifact.filename.clone());

        Some(Content::Media {
            media_kind,
            mime_type: payload.mime_type,
            filename,
            url: artifact.url,
            caption: message.caption.clone().filter(|c| !c.is_empty()),
        })
    }
}
