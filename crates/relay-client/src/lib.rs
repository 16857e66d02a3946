//! WhatsApp client capability for the relay.
//!
//! The browser-automation client is an external collaborator. This crate
//! pins down the surface the relay needs from it:
//!
//! - [`WhatsAppClient`]: connect, send, chat lookup, media download,
//!   contact lookup, destroy
//! - [`Chat`]: a resolved chat object (send, presence states)
//! - [`ClientFactory`]: builds one client instance per start
//! - [`ClientEvent`]: everything the client reports back, delivered through
//!   an [`EventSink`] tagged with the instance generation
//!
//! [`SidecarClient`] implements the surface over HTTP against a sidecar
//! process that hosts the browser. With the `test-util` feature,
//! [`fake::FakeClient`] provides a scriptable in-memory implementation.

pub mod error;
pub mod event;
pub mod sidecar;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use error::{ClientError, Result};
pub use event::{ClientEvent, EventSink, GenerationEvent};
pub use sidecar::{SidecarClient, SidecarFactory};
pub use traits::{Chat, ClientFactory, WhatsAppClient};
pub use types::{
    ClientInfo, Contact, MediaPayload, OutgoingContent, RawMessage, SendOptions, SentMessage,
};
