//! API error types.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_runtime::{DispatchError, RuntimeError};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error type for consistent error responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// The chat or destination does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The WhatsApp session is not connected.
    #[error("WhatsApp client is not connected, try again later")]
    NotConnected,

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotConnected | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(status = %status, error = %self, "request failed");
        }
        let body = Json(json!({
            "success": false,
            "error": self.to_string()
        }));
        (status, body).into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotConnected => ApiError::NotConnected,
            DispatchError::InvalidRequest(_) | DispatchError::UnsupportedMediaKind(_) => {
                ApiError::BadRequest(err.to_string())
            }
            DispatchError::DestinationNotFound(_) => ApiError::NotFound(err.to_string()),
            DispatchError::SendFailed(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_mapping() {
        let cases = [
            (DispatchError::NotConnected, StatusCode::INTERNAL_SERVER_ERROR),
            (
                DispatchError::InvalidRequest("parameter \"to\" is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::UnsupportedMediaKind("sticker".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::DestinationNotFound("1@c.us".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                DispatchError::SendFailed("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::from(DispatchError::DestinationNotFound("1@c.us".into()));
        assert_eq!(err.to_string(), "no chat found for 1@c.us");
    }
}
