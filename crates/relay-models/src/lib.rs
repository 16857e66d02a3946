//! Core data models for the WhatsApp relay.
//!
//! This crate provides the types shared by every other relay crate:
//! chat identifiers, the session lifecycle status, the normalized
//! [`MessageEnvelope`] handed to webhooks, and the [`OutboundRequest`]
//! accepted by the send API.

pub mod builders;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod request;
pub mod session;

// Re-export main types
pub use builders::EnvelopeBuilder;
pub use envelope::{Content, Direction, MediaKind, MessageEnvelope};
pub use error::{ModelError, Result};
pub use ids::{strip_suffix, ChatId, Destination, SessionIdentity};
pub use request::{MediaType, OutboundMedia, OutboundRequest, SendPlan};
pub use session::SessionStatus;
