//! Status endpoints.

use axum::{extract::State, Json};

use crate::state::AppState;
use crate::types::HealthResponse;

/// Static text shown at the root.
pub const ROOT_TEXT: &str = "WhatsApp relay is running";

/// GET / - Liveness text.
pub async fn index() -> &'static str {
    ROOT_TEXT
}

/// GET /api/health - Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.uptime_seconds(),
        session_status: state.supervisor.status().to_string(),
    })
}
