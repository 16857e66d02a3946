//! Session state machine.
//!
//! A single pure transition function maps the current [`SessionStatus`] and a
//! [`ClientEvent`] onto the next status and the side effect the supervisor
//! must perform. Every legal edge is enumerated here:
//!
//! ```text
//! UNINITIALIZED --qr--> AWAITING_QR --authenticated--> AUTHENTICATING --ready--> CONNECTED
//! CONNECTED --disconnected--> DISCONNECTED --(restart)--> AWAITING_QR
//! *         --auth_failure--> AUTH_FAILED  --(restart)--> AWAITING_QR
//! CONNECTED --change_state(!CONNECTED)--> AUTHENTICATING --change_state(CONNECTED)--> CONNECTED
//! ```

use relay_client::{ClientEvent, RawMessage};
use relay_models::SessionStatus;

/// Client states after which the session must be taken over from another device.
const TAKE_OVER_STATES: &[&str] = &["CONFLICT", "UNPAIRED"];

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Nothing to do.
    None,
    /// Forward the QR payload to the viewer.
    ShowQr(String),
    /// The session became ready: clear guards, reset backoff, notify the viewer.
    Ready,
    /// Tear the instance down and restart after backoff.
    Restart { reason: String },
    /// Ask the client to take the session over.
    TakeOver,
    /// Hand the message to the inbound pipeline.
    Relay(RawMessage),
}

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionStatus,
    pub action: Action,
}

impl Transition {
    fn to(next: SessionStatus, action: Action) -> Self {
        Self { next, action }
    }

    fn stay(current: SessionStatus) -> Self {
        Self::to(current, Action::None)
    }
}

/// Computes the next status and action for an event.
pub fn transition(current: SessionStatus, event: ClientEvent) -> Transition {
    match event {
        ClientEvent::Qr { qr } => Transition::to(SessionStatus::AwaitingQr, Action::ShowQr(qr)),

        ClientEvent::Authenticated => match current {
            SessionStatus::Uninitialized | SessionStatus::AwaitingQr => {
                Transition::stay(SessionStatus::Authenticating)
            }
            other => Transition::stay(other),
        },

        ClientEvent::Ready => Transition::to(SessionStatus::Connected, Action::Ready),

        ClientEvent::AuthFailure { message } => Transition::to(
            SessionStatus::AuthFailed,
            Action::Restart {
                reason: format!("auth failure: {}", message),
            },
        ),

        ClientEvent::Disconnected { reason } => Transition::to(
            SessionStatus::Disconnected,
            Action::Restart {
                reason: format!("disconnected: {}", reason),
            },
        ),

        ClientEvent::ChangeState { state } => {
            let state = state.to_ascii_uppercase();
            if state == "CONNECTED" {
                return Transition::stay(SessionStatus::Connected);
            }
            let next = if current.is_connected() {
                SessionStatus::Authenticating
            } else {
                current
            };
            if TAKE_OVER_STATES.contains(&state.as_str()) {
                Transition::to(next, Action::TakeOver)
            } else {
                Transition::stay(next)
            }
        }

        ClientEvent::Message { message } => Transition::to(current, Action::Relay(message)),
    }
}
