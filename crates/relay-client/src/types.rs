//! Data exchanged with the client library.

use relay_models::ids::STATUS_BROADCAST;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chat message exactly as the client reports it.
///
/// Field names follow the client library. Fields this crate does not model
/// are kept in `extra` so the raw event can be forwarded for inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Serialized message ID.
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default, alias = "isGroupMsg")]
    pub is_group: bool,
    #[serde(default)]
    pub is_status: bool,
    #[serde(default, rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, alias = "isMedia")]
    pub has_media: bool,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawMessage {
    /// Returns true for status-feed broadcasts.
    pub fn is_status_broadcast(&self) -> bool {
        self.is_status || self.from == STATUS_BROADCAST || self.to == STATUS_BROADCAST
    }

    /// Returns true when either flag or address marks a group chat.
    pub fn is_group_chat(&self) -> bool {
        self.is_group || self.from.ends_with("@g.us") || self.to.ends_with("@g.us")
    }

    /// The chat the message belongs to (the other party).
    pub fn chat_id(&self) -> &str {
        if self.from_me {
            &self.to
        } else {
            &self.from
        }
    }

    /// The raw event as JSON.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The account's own identity as reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Own WhatsApp ID (`<number>@c.us`).
    pub wid: String,
    #[serde(default)]
    pub pushname: Option<String>,
}

/// Contact details for a chat participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub pushname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Contact {
    /// Preferred display name: push name, then saved name, else empty.
    pub fn display_name(&self) -> String {
        [self.pushname.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// A binary media blob with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

/// Options attached to an outgoing media message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Render audio as a recorded voice note instead of a file.
    #[serde(default)]
    pub send_audio_as_voice: bool,
}

/// What to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingContent {
    Text(String),
    Media {
        media: MediaPayload,
        options: SendOptions,
    },
}

impl OutgoingContent {
    /// Returns true when the content is framed as a voice note.
    pub fn is_voice_note(&self) -> bool {
        matches!(self, OutgoingContent::Media { options, .. } if options.send_audio_as_voice)
    }
}

/// Acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    /// Provider-assigned message ID.
    pub message_id: String,
}
