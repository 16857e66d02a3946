//! WhatsApp bot relay.
//!
//! Keeps one WhatsApp Web session alive, forwards incoming chat messages to
//! workflow webhooks (n8n style) and exposes an HTTP API to send messages
//! and chat presence states back.
//!
//! # Environment Variables
//!
//! Required:
//! - `N8N_WEBHOOK_URL`: primary inbound webhook
//!
//! Optional:
//! - `N8N_HUMAN_TAKEOVER_WEBHOOK_URL`: webhook for self-sent messages
//! - `QR_SERVICE_URL`: QR viewer service notified about QR codes and status
//! - `SIDECAR_URL`: WhatsApp Web sidecar (default: http://127.0.0.1:21465)
//! - `PORT` / `HOST`: listen address (default: 0.0.0.0:8080)
//!
//! See [`Settings`] for the full list.

pub mod error;
pub mod settings;

pub use error::{AppError, Result};
pub use settings::Settings;
