//! Outbound send requests.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ModelError, Result};
use crate::ids::Destination;

/// Raw send request as accepted by the HTTP API.
///
/// Every field is optional at the wire level so that missing fields are
/// reported as validation errors instead of deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRequest {
    /// Destination number or full chat identifier.
    pub to: Option<String>,
    /// Text body; used as fallback when the media type is unsupported.
    pub message: Option<String>,
    /// One of image, video, document, audio, ptt.
    pub media_type: Option<String>,
    /// Public http(s) URL of the media to send.
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

/// Requested media framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
    Document,
    Audio,
    Ptt,
    /// Anything else, kept verbatim for the error message.
    Unsupported(String),
}

impl MediaType {
    /// Parses a media type tag (case-insensitive).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "image" => MediaType::Image,
            "video" => MediaType::Video,
            "document" => MediaType::Document,
            "audio" => MediaType::Audio,
            "ptt" => MediaType::Ptt,
            _ => MediaType::Unsupported(raw.to_string()),
        }
    }

    /// Audio is always delivered as a voice note.
    pub fn is_voice(&self) -> bool {
        matches!(self, MediaType::Audio | MediaType::Ptt)
    }
}

/// Validated media part of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub media_type: MediaType,
    pub url: Url,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

/// A validated send request, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendPlan {
    pub destination: Destination,
    pub text: Option<String>,
    pub media: Option<OutboundMedia>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

impl OutboundRequest {
    /// Creates a plain text request.
    pub fn text(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Creates a media request.
    pub fn media(
        to: impl Into<String>,
        media_type: impl Into<String>,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            to: Some(to.into()),
            media_type: Some(media_type.into()),
            media_url: Some(media_url.into()),
            ..Self::default()
        }
    }

    /// Validates the request without touching the client.
    ///
    /// Requires a destination and either a text or a media type + URL pair.
    /// Media URLs must use http or https.
    pub fn validate(&self) -> Result<SendPlan> {
        let to = non_empty(&self.to).ok_or_else(|| {
            ModelError::InvalidRequest("parameter \"to\" is required".to_string())
        })?;
        let destination = Destination::parse(&to)?;
        let text = non_empty(&self.message);

        let media = match (non_empty(&self.media_type), non_empty(&self.media_url)) {
            (Some(media_type), Some(media_url)) => Some(OutboundMedia {
                media_type: MediaType::parse(&media_type),
                url: parse_media_url(&media_url)?,
                caption: non_empty(&self.caption),
                filename: non_empty(&self.filename),
            }),
            _ => None,
        };

        if text.is_none() && media.is_none() {
            return Err(ModelError::InvalidRequest(
                "no text message or media provided".to_string(),
            ));
        }

        Ok(SendPlan {
            destination,
            text,
            media,
        })
    }
}

fn parse_media_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        ModelError::InvalidRequest(format!("invalid media URL {}: {}", raw, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ModelError::InvalidRequest(format!(
            "invalid media URL scheme {}: must be http or https",
            other
        ))),
    }
}
