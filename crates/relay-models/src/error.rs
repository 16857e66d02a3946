//! Validation errors for model types.

use thiserror::Error;

/// Errors raised while building or validating model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Destination could not be turned into a chat identifier.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// Session identity is empty or not usable as a directory name.
    #[error("invalid session identity: {0}")]
    InvalidIdentity(String),

    /// Outbound request is missing required fields or is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
