//! Chat identifiers and the session identity.
//!
//! WhatsApp addresses chats as `<user>@<server>`: `5511999999999@c.us` for a
//! person, `1203630@g.us` for a group and `status@broadcast` for the status feed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, Result};

/// Server suffix for person-to-person chats.
pub const PERSONAL_SERVER: &str = "c.us";

/// Server suffix for group chats.
pub const GROUP_SERVER: &str = "g.us";

/// Chat identifier of the status broadcast feed.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Directory prefix shared by every persisted session.
pub const SESSION_DIR_PREFIX: &str = "session-";

/// Generates string newtypes with the common conversions.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ChatId);
define_id!(SessionIdentity);

/// Returns the user part of a WhatsApp identifier (everything before `@`).
pub fn strip_suffix(id: &str) -> &str {
    id.split_once('@').map_or(id, |(user, _)| user)
}

impl ChatId {
    /// Builds a person-to-person chat ID from a bare number.
    pub fn personal(number: &str) -> Self {
        Self(format!("{}@{}", number, PERSONAL_SERVER))
    }

    /// Returns the user part without the server suffix.
    pub fn user(&self) -> &str {
        strip_suffix(&self.0)
    }

    /// Returns true for group chats.
    pub fn is_group(&self) -> bool {
        self.0.ends_with(&format!("@{}", GROUP_SERVER))
    }

    /// Returns true for the status broadcast feed.
    pub fn is_status_broadcast(&self) -> bool {
        self.0 == STATUS_BROADCAST
    }
}

impl SessionIdentity {
    /// Creates a validated identity.
    ///
    /// The identity becomes part of a directory name, so it must be non-empty
    /// and must not contain path separators.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidIdentity("identity is empty".to_string()));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(ModelError::InvalidIdentity(format!(
                "identity must be a plain name: {}",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Directory name holding this identity's persisted login.
    pub fn dir_name(&self) -> String {
        format!("{}{}", SESSION_DIR_PREFIX, self.0)
    }
}

/// A send destination after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Bare phone number (digits only); gets the personal suffix.
    Number(String),
    /// Full identifier supplied by the caller, passed through unchanged.
    Explicit(ChatId),
}

impl Destination {
    /// Normalizes a caller-supplied destination.
    ///
    /// Anything containing `@` is taken as a full identifier. Otherwise all
    /// non-digit characters are stripped, so `+1 (555) 123-4567` becomes
    /// `15551234567`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.contains('@') {
            if strip_suffix(raw).is_empty() {
                return Err(ModelError::InvalidDestination(raw.to_string()));
            }
            return Ok(Self::Explicit(ChatId::from_string(raw)));
        }

        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(ModelError::InvalidDestination(raw.to_string()));
        }
        Ok(Self::Number(digits))
    }

    /// Returns the chat ID this destination addresses.
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Number(digits) => ChatId::personal(digits),
            Self::Explicit(id) => id.clone(),
        }
    }
}
