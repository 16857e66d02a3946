//! Request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of the chat-state endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatStateRequest {
    /// Destination number or chat ID. Missing is a 400, not a parse error.
    pub to: Option<String>,
}

/// Generic success body.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response to `POST /api/send-whatsapp-message`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: String,
    /// Message ID assigned by WhatsApp.
    pub provider_message_id: String,
}

/// Response to `POST /api/request-qr`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestQrResponse {
    pub success: bool,
    pub message: String,
    /// True only when a new client instance was launched.
    pub started: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Current WhatsApp session status.
    pub session_status: String,
}
