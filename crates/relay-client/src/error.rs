//! Error types for client operations.

use thiserror::Error;

/// Errors reported by a client implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The addressed chat does not exist or is not known to the client.
    #[error("no chat found: {0}")]
    ChatNotFound(String),

    /// The client refused or failed to deliver a message.
    #[error("send failed: {0}")]
    Send(String),

    /// The implementation does not offer this capability.
    #[error("unsupported capability: {0}")]
    Unsupported(&'static str),

    /// The client instance is not running.
    #[error("client not running")]
    NotRunning,

    /// Transport error talking to the client.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The client answered with something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Returns true if the error means the destination is unknown.
    pub fn is_chat_not_found(&self) -> bool {
        matches!(self, ClientError::ChatNotFound(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Protocol(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
