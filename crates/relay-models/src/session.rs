//! Session lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the single client session.
///
/// Only the connection supervisor mutates this value, in response to events
/// emitted by the client library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// No client instance has been started yet.
    #[default]
    Uninitialized,
    /// The client is waiting for a QR code to be scanned.
    AwaitingQr,
    /// Credentials were accepted; the client is loading.
    Authenticating,
    /// The client is ready to send and receive.
    Connected,
    /// The client lost its connection.
    Disconnected,
    /// The client rejected the stored or scanned credentials.
    AuthFailed,
}

impl SessionStatus {
    /// Returns true only when outbound operations may proceed.
    pub fn is_connected(self) -> bool {
        matches!(self, SessionStatus::Connected)
    }

    /// Returns true for states that trigger a teardown and restart.
    pub fn is_failure(self) -> bool {
        matches!(self, SessionStatus::Disconnected | SessionStatus::AuthFailed)
    }

    /// Stable upper-case name used in logs and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Uninitialized => "UNINITIALIZED",
            SessionStatus::AwaitingQr => "AWAITING_QR",
            SessionStatus::Authenticating => "AUTHENTICATING",
            SessionStatus::Connected => "CONNECTED",
            SessionStatus::Disconnected => "DISCONNECTED",
            SessionStatus::AuthFailed => "AUTH_FAILED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
