//! Async runtime for the WhatsApp relay.
//!
//! This crate holds the relay core:
//! - [`ConnectionSupervisor`] - owns the one live client instance, applies
//!   the session state machine and restarts after failures with backoff
//! - [`InboundNormalizer`] - filters raw messages and builds envelopes
//! - [`RelayRouter`] - delivers envelopes to the primary or human-takeover
//!   webhook, fire-and-forget
//! - [`OutboundDispatcher`] - validates send requests and drives the client
//! - [`Runtime`] - main entry point wiring all of the above
//!
//! # Example
//!
//! ```ignore
//! use relay_client::SidecarFactory;
//! use relay_runtime::{Runtime, RuntimeConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sidecar = "http://127.0.0.1:21465".parse()?;
//!     let factory = SidecarFactory::new(sidecar, Duration::from_secs(30))?;
//!     let config = RuntimeConfig::new().with_webhook("http://n8n.local/webhook/in".parse()?);
//!
//!     let mut runtime = Runtime::new(config, Arc::new(factory))?;
//!     runtime.start().await?;
//!
//!     // Watch the session come up
//!     let mut status = runtime.supervisor().subscribe();
//!     while status.changed().await.is_ok() {
//!         println!("session is {}", *status.borrow());
//!     }
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Generations
//!
//! Every client instance gets a generation number. Events and scheduled
//! restarts carry the generation they belong to, so nothing from a torn-down
//! instance can change the state of its successor.
//!
//! ## Ordering
//!
//! Client events are consumed by a single [`InboundPipeline`] task. Each
//! message is filtered, deduplicated, normalized and relayed before the next
//! event is read.

pub mod backoff;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod normalizer;
pub mod qr;
pub mod relay;
pub mod runtime;
pub mod state;
pub mod supervisor;
pub mod viewer;

#[cfg(test)]
mod test_support;

pub use backoff::Backoff;
pub use config::{BackoffConfig, RuntimeConfig, DEFAULT_IDENTITY};
pub use dedup::RecentIds;
pub use dispatcher::{ChatState, OutboundDispatcher};
pub use error::{DispatchError, Result, RuntimeError};
pub use normalizer::{drop_reason, DropReason, InboundNormalizer};
pub use qr::render_qr;
pub use relay::{route, RelayRouter, RelayTarget, SelfSentRouting};
pub use runtime::{InboundPipeline, Runtime};
pub use state::{transition, Action, Transition};
pub use supervisor::ConnectionSupervisor;
pub use viewer::ViewerNotifier;
