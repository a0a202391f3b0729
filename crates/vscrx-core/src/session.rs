//! Session identity, lifecycle events, and the transport seam.
//!
//! A *session* is one socket connection attempt.  The connection manager opens
//! a new session on every connect and reconnect, and numbers them with a
//! monotonically increasing [`SessionId`].  Every event a transport reports is
//! tagged with the id of the session it belongs to, so events from a session
//! that has since been superseded can be recognised and dropped.
//!
//! # Event ordering
//!
//! For a single session a transport emits, in order:
//!
//! ```text
//! Opened?  →  Error?  →  Closed
//! ```
//!
//! `Opened` is absent when the connection never came up; `Error` is absent on
//! a clean close.  `Closed` is always the last event, including after an
//! error, which is what lets the manager schedule exactly one reconnect per
//! session.

use std::fmt;

use thiserror::Error;

/// Version number of a socket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Low-level socket failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established (DNS, refused, unreachable,
    /// handshake rejected).
    #[error("connect failed: {0}")]
    Connect(String),
    /// An established connection failed while reading or writing.
    #[error("socket error: {0}")]
    Socket(String),
    /// A write was attempted on a session that is not open.
    #[error("session {0} is not open")]
    NotOpen(SessionId),
}

/// One lifecycle event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed; the session is writable.
    Opened,
    /// The session ended, either peer-initiated or after a failure.
    Closed,
    /// The transport failed.  A [`TransportEvent::Closed`] always follows.
    Error(TransportError),
}

/// A [`TransportEvent`] tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: TransportEvent,
}

impl SessionEvent {
    pub fn new(session: SessionId, event: TransportEvent) -> Self {
        Self { session, event }
    }
}

/// The socket layer driven by the connection manager.
///
/// All methods must return promptly without blocking the caller.  Outcomes of
/// [`Transport::open`] are reported asynchronously as [`SessionEvent`]s
/// through whatever channel the implementation was constructed with.
///
/// The production implementation speaks WebSocket; tests use a recording
/// mock and inject events by hand.
pub trait Transport {
    /// Begins opening `session` against `url`.
    fn open(&mut self, session: SessionId, url: &str);

    /// Shuts `session` down.  Pending writes need not be drained.
    ///
    /// Closing a session that is unknown or already closed is a no-op.
    fn close(&mut self, session: SessionId);

    /// Whether a text frame written to `session` right now would be accepted.
    fn is_writable(&self, session: SessionId) -> bool;

    /// Writes `text` to `session` as one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] if the session is not open, or a
    /// [`TransportError::Socket`] if the write could not be queued.
    fn send_text(&mut self, session: SessionId, text: &str) -> Result<(), TransportError>;
}
