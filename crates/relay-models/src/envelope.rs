//! The normalized message envelope delivered to webhooks.

use serde::{Deserialize, Serialize};

/// Who originated the underlying chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from a third party.
    Inbound,
    /// Sent from the account itself (operator or bot).
    OutboundSelf,
}

impl Direction {
    /// Derives the direction from the client's `fromMe` flag.
    pub fn from_self_sent(from_me: bool) -> Self {
        if from_me {
            Direction::OutboundSelf
        } else {
            Direction::Inbound
        }
    }
}

/// Kind of media attached to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Image,
    Video,
    Document,
    Other,
}

impl MediaKind {
    /// Maps a client message type onto a media kind.
    ///
    /// Voice notes (`ptt`) are audio. Unrecognized types map to `Other`.
    pub fn from_message_type(message_type: &str) -> Self {
        match message_type {
            "audio" | "ptt" => MediaKind::Audio,
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "document" => MediaKind::Document,
            _ => MediaKind::Other,
        }
    }
}

/// Message content. Exactly one variant is ever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    /// Plain text message.
    Text { body: String },
    /// Media stored locally and served back at `url`.
    Media {
        media_kind: MediaKind,
        mime_type: String,
        filename: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// Anything else; the raw client event is kept for inspection.
    Unknown { raw: serde_json::Value },
}

impl Content {
    /// Short tag of the populated variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text { .. } => "text",
            Content::Media { .. } => "media",
            Content::Unknown { .. } => "unknown",
        }
    }
}

/// A normalized, direction-tagged chat event.
///
/// Built per inbound event, forwarded once and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// User part of the account's own number.
    pub phone_number_id: String,
    /// Account profile name, falling back to the number.
    pub display_phone_number: String,
    /// Sender, without network suffix.
    pub from: String,
    /// Recipient, without network suffix.
    pub to: String,
    /// Contact display name; empty when the lookup failed.
    pub contact_name: String,
    pub direction: Direction,
    /// Mirrors `direction` for consumers that key off the raw flag.
    pub from_me: bool,
    pub is_group: bool,
    pub message_id: String,
    pub timestamp: i64,
    pub message_type: String,
    pub content: Content,
}

impl MessageEnvelope {
    /// Returns true when the envelope came from a self-sent event.
    pub fn is_self_sent(&self) -> bool {
        self.direction == Direction::OutboundSelf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direction_from_flag() {
        assert_eq!(Direction::from_self_sent(true), Direction::OutboundSelf);
        assert_eq!(Direction::from_self_sent(false), Direction::Inbound);
    }

    #[test]
    fn test_media_kind_mapping() {
        assert_eq!(MediaKind::from_message_type("ptt"), MediaKind::Audio);
        assert_eq!(MediaKind::from_message_type("audio"), MediaKind::Audio);
        assert_eq!(MediaKind::from_message_type("image"), MediaKind::Image);
        assert_eq!(MediaKind::from_message_type("document"), MediaKind::Document);
        assert_eq!(MediaKind::from_message_type("sticker"), MediaKind::Other);
    }

    #[test]
    fn test_content_serializes_single_variant() {
        let text = serde_json::to_value(Content::Text {
            body: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(text, json!({"kind": "text", "body": "hello"}));

        let media = serde_json::to_value(Content::Media {
            media_kind: MediaKind::Image,
            mime_type: "image/jpeg".to_string(),
            filename: "a.jpeg".to_string(),
            url: "http://host/media/a.jpeg".to_string(),
            caption: None,
        })
        .unwrap();
        let object = media.as_object().unwrap();
        assert_eq!(object["kind"], "media");
        assert_eq!(object["media_kind"], "image");
        assert!(!object.contains_key("caption"));
        assert!(!object.contains_key("body"));
        assert!(!object.contains_key("raw"));
    }
}
