//! Events emitted by a client instance.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::RawMessage;

/// Everything a client instance reports back to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A QR code must be scanned to log in.
    Qr { qr: String },
    /// Credentials were accepted.
    Authenticated,
    /// The client is ready.
    Ready,
    /// Credentials were rejected.
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    /// The connection was lost.
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    /// The client's internal connection state changed.
    ChangeState { state: String },
    /// A message was created (received or sent by this account).
    Message { message: RawMessage },
}

impl ClientEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Qr { .. } => "qr",
            ClientEvent::Authenticated => "authenticated",
            ClientEvent::Ready => "ready",
            ClientEvent::AuthFailure { .. } => "auth_failure",
            ClientEvent::Disconnected { .. } => "disconnected",
            ClientEvent::ChangeState { .. } => "change_state",
            ClientEvent::Message { .. } => "message",
        }
    }
}

/// An event tagged with the generation of the instance that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationEvent {
    pub generation: u64,
    pub event: ClientEvent,
}

/// Sending half handed to each client instance.
///
/// Every instance gets its own generation number, so events from a torn-down
/// instance can be told apart from the live one.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<GenerationEvent>,
}

impl EventSink {
    /// Creates a sink for the given generation.
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<GenerationEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation this sink tags events with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Emits an event. Returns false once the receiving side is gone.
    pub fn emit(&self, event: ClientEvent) -> bool {
        debug!(generation = self.generation, event = event.name(), "client event");
        self.tx
            .send(GenerationEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Returns true once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
