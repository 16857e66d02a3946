//! Error types for the relay binary.

use thiserror::Error;

/// Errors that stop the relay from starting or running.
#[derive(Debug, Error)]
pub enum AppError {
    /// A setting is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The runtime failed.
    #[error(transparent)]
    Runtime(#[from] relay_runtime::RuntimeError),

    /// The sidecar client could not be built.
    #[error(transparent)]
    Client(#[from] relay_client::ClientError),

    /// IO error, e.g. binding the listen port.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the relay binary.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<relay_models::ModelError> for AppError {
    fn from(err: relay_models::ModelError) -> Self {
        AppError::Config(err.to_string())
    }
}
