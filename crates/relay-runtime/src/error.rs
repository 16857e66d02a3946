//! Error types for the runtime crate.

use relay_client::ClientError;
use relay_models::ModelError;
use relay_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Session or media storage failed.
    #[error("storage error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The client instance failed.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Runtime not started.
    #[error("runtime not started")]
    NotStarted,

    /// Runtime already started.
    #[error("runtime already started")]
    AlreadyStarted,

    /// The runtime was shut down.
    #[error("runtime is shut down")]
    Stopped,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// HTTP client setup failed.
    #[error("http client error: {0}")]
    Http(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors returned by outbound operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The session is not connected; nothing is queued.
    #[error("WhatsApp client is not connected")]
    NotConnected,

    /// The request was rejected before reaching the client.
    #[error("{0}")]
    InvalidRequest(String),

    /// The media kind is not supported and no text was given.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaKind(String),

    /// The destination chat does not exist.
    #[error("no chat found for {0}")]
    DestinationNotFound(String),

    /// The client failed to send.
    #[error("send failed: {0}")]
    SendFailed(String),
}

impl From<ModelError> for DispatchError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidRequest(msg) => DispatchError::InvalidRequest(msg),
            other => DispatchError::InvalidRequest(other.to_string()),
        }
    }
}
