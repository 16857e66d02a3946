//! Builder for message envelopes.

use crate::envelope::{Content, Direction, MessageEnvelope};
use crate::ids::strip_suffix;

/// Builder for creating [`MessageEnvelope`] instances with a fluent API.
///
/// Identifiers passed to [`EnvelopeBuilder::new`] may carry their network
/// suffix; it is stripped on build.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    message_id: String,
    from: String,
    to: String,
    from_me: bool,
    is_group: bool,
    timestamp: i64,
    message_type: String,
    contact_name: String,
    phone_number_id: String,
    display_phone_number: String,
}

impl EnvelopeBuilder {
    /// Creates a new builder with the required routing fields.
    pub fn new(
        message_id: impl Into<String>,
        from: impl AsRef<str>,
        to: impl AsRef<str>,
        from_me: bool,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            from: strip_suffix(from.as_ref()).to_string(),
            to: strip_suffix(to.as_ref()).to_string(),
            from_me,
            is_group: false,
            timestamp: 0,
            message_type: String::new(),
            contact_name: String::new(),
            phone_number_id: String::new(),
            display_phone_number: String::new(),
        }
    }

    /// Marks the envelope as coming from a group chat.
    pub fn group(mut self, is_group: bool) -> Self {
        self.is_group = is_group;
        self
    }

    /// Sets the client timestamp (seconds since epoch).
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the client message type tag.
    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    /// Sets the contact display name.
    pub fn contact_name(mut self, name: impl Into<String>) -> Self {
        self.contact_name = name.into();
        self
    }

    /// Sets the account's own number and profile name.
    ///
    /// An empty profile name falls back to the number.
    pub fn account(mut self, wid: impl AsRef<str>, pushname: Option<&str>) -> Self {
        let number = strip_suffix(wid.as_ref()).to_string();
        self.display_phone_number = pushname
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| number.clone());
        self.phone_number_id = number;
        self
    }

    /// Builds the envelope around the given content.
    pub fn build(self, content: Content) -> MessageEnvelope {
        MessageEnvelope {
            phone_number_id: self.phone_number_id,
            display_phone_number: self.display_phone_number,
            from: self.from,
            to: self.to,
            contact_name: self.contact_name,
            direction: Direction::from_self_sent(self.from_me),
            from_me: self.from_me,
            is_group: self.is_group,
            message_id: self.message_id,
            timestamp: self.timestamp,
            message_type: self.message_type,
            content,
        }
    }
}
