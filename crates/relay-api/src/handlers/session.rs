//! Session control handlers.

use axum::{extract::State, Json};
use relay_runtime::render_qr;
use tracing::info;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::{ActionResponse, RequestQrResponse};

/// POST /reset-session - Drop the saved login and start over with a new QR.
pub async fn reset_session(State(state): State<AppState>) -> Result<Json<ActionResponse>> {
    info!("session reset requested");
    state.supervisor.reset().await?;

    Ok(Json(ActionResponse::ok(
        "session reset and files removed; a new QR code will be generated",
    )))
}

/// POST /api/request-qr - Start the client unless already connected.
pub async fn request_qr(State(state): State<AppState>) -> Result<Json<RequestQrResponse>> {
    let started = state.supervisor.request_qr().await?;
    let message = if started {
        "client instructed to start and generate a QR code"
    } else if state.supervisor.is_connected() {
        "client already connected"
    } else {
        "client already starting, a QR code will follow"
    };

    Ok(Json(RequestQrResponse {
        success: true,
        message: message.to_string(),
        started,
    }))
}

/// GET /api/qr - The QR code waiting to be scanned, rendered as text.
pub async fn qr_code(State(state): State<AppState>) -> Result<String> {
    let qr = state
        .supervisor
        .pending_qr()
        .ok_or_else(|| ApiError::NotFound("no QR code pending".to_string()))?;
    render_qr(&qr).ok_or_else(|| ApiError::Internal("QR code could not be rendered".to_string()))
}
