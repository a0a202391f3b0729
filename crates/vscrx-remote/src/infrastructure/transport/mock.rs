//! Mock transport for unit testing.
//!
//! Records every `open`, `close`, and `send_text` call so tests can assert on
//! them, and never produces events by itself: tests feed
//! [`vscrx_core::SessionEvent`]s to the manager directly.
//!
//! Clones share state, so a test can keep one clone while the manager owns
//! another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vscrx_core::{SessionId, Transport, TransportError};

#[derive(Debug)]
struct MockState {
    opened: Vec<(SessionId, String)>,
    closed: Vec<SessionId>,
    sent: Vec<(SessionId, String)>,
    writable: bool,
    fail_writes: bool,
}

/// A recording implementation of [`Transport`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a mock whose opened sessions are writable.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                opened: Vec::new(),
                closed: Vec::new(),
                sent: Vec::new(),
                writable: true,
                fail_writes: false,
            })),
        }
    }

    /// A test that panicked while holding the lock must not hide the
    /// recorded calls from later assertions.
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every `open` call so far, as `(session, url)`.
    pub fn opened(&self) -> Vec<(SessionId, String)> {
        self.lock().opened.clone()
    }

    /// Every session passed to `close`.
    pub fn closed(&self) -> Vec<SessionId> {
        self.lock().closed.clone()
    }

    /// Every frame accepted by `send_text`, as `(session, text)`.
    pub fn sent(&self) -> Vec<(SessionId, String)> {
        self.lock().sent.clone()
    }

    /// Simulates a socket that is (or is not) ready to write.
    pub fn set_writable(&self, writable: bool) {
        self.lock().writable = writable;
    }

    /// Makes `send_text` fail even when the session looks writable.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn is_live(&self, session: SessionId) -> bool {
        self.opened.iter().any(|(id, _)| *id == session) && !self.closed.contains(&session)
    }
}

impl Transport for MockTransport {
    fn open(&mut self, session: SessionId, url: &str) {
        self.lock().opened.push((session, url.to_string()));
    }

    fn close(&mut self, session: SessionId) {
        self.lock().closed.push(session);
    }

    fn is_writable(&self, session: SessionId) -> bool {
        let state = self.lock();
        state.writable && state.is_live(session)
    }

    fn send_text(&mut self, session: SessionId, text: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(TransportError::Socket("simulated write failure".to_string()));
        }
        if !(state.writable && state.is_live(session)) {
            return Err(TransportError::NotOpen(session));
        }
        state.sent.push((session, text.to_string()));
        Ok(())
    }
}
