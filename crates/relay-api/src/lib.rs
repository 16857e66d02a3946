//! HTTP boundary for the WhatsApp relay.
//!
//! Exposes the session controls, chat presence states and outbound sends
//! of a running [`relay_runtime::Runtime`], and serves stored media back
//! under `/media`.
//!
//! # Example
//!
//! ```ignore
//! use relay_api::{serve, ApiConfig, AppState};
//!
//! let config = ApiConfig::new("0.0.0.0", 8080).with_media_root("./tmp/media");
//! let state = AppState::from_runtime(config.clone(), &runtime);
//! serve(config, state).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve, serve_with_shutdown};
pub use state::AppState;
