//! Observable state of the link to the editor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection status of the remote as shown to the user.
///
/// Exactly one value holds at any instant.  The value is derived from the
/// most recent lifecycle event of the current session:
///
/// ```text
///                 open
/// Disconnected ─────────► Connected
///      ▲  ▲                  │
///      │  └──── close ───────┘   (close also schedules a reconnect)
///      │
///      └──── close ──── ConnectionFailed ◄──── error (from any state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No open session.  Initial state, and the state while a reconnect is
    /// pending or in flight.
    #[default]
    Disconnected,
    /// The WebSocket handshake completed; commands can be sent.
    Connected,
    /// The transport reported an error.  A close event always follows.
    #[serde(rename = "Connection Failed")]
    ConnectionFailed,
}

impl ConnectionStatus {
    /// The user-facing label, e.g. `"Connection Failed"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::ConnectionFailed => "Connection Failed",
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
