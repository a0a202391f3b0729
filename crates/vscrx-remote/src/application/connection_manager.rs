//! ConnectionManager: owns the socket session and the connection status.
//!
//! # Connection lifecycle
//!
//! ```text
//! connect(addr) ──► open session N ──► Opened ──► Connected
//!                        │                           │
//!                        └── Error ──► ConnectionFailed
//!                                            │       │
//!                        Closed ◄────────────┴───────┘
//!                          │
//!                          ▼
//!                     Disconnected + RetryTask { session: N, addr }
//!                          │  (after reconnect_delay)
//!                          ▼
//!                  on_retry_due ──► connect(addr) ──► session N+1 …
//! ```
//!
//! Only the *current* session may change the status.  Every `connect` call
//! allocates a fresh [`SessionId`]; events tagged with an older id come from a
//! session this manager has already closed and are dropped.  The same check
//! invalidates retry tasks: a task only fires while its session is still the
//! current one, so a retry scheduled for an old address never reconnects after
//! the user has picked a new one.
//!
//! # No locks
//!
//! The manager is owned by a single event loop task and every method takes
//! `&mut self`, so the status and session slot are never shared.  Observers
//! get a `watch` receiver instead of a reference.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use vscrx_core::{
    Address, ConnectionStatus, SessionEvent, SessionId, Transport, TransportEvent, DEFAULT_PORT,
};

use super::command_channel::CommandChannel;

/// Delay between a close event and the reconnect attempt it schedules.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Tunables for the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Port appended to the address when building the WebSocket URL.
    pub port: u16,
    /// Fixed wait before each reconnect.  There is no backoff and no cap.
    pub reconnect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// A reconnect that should run once `delay` has elapsed.
///
/// Hand it back to [`ConnectionManager::on_retry_due`] when the timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTask {
    /// The session whose close scheduled this retry.
    pub session: SessionId,
    /// Address captured when the retry was scheduled.
    pub address: Address,
    pub delay: Duration,
}

#[derive(Debug)]
struct CurrentSession {
    id: SessionId,
    address: Address,
    closed: bool,
}

/// Keeps one logical connection alive to the configured address.
pub struct ConnectionManager<T: Transport> {
    transport: T,
    config: ConnectionConfig,
    current: Option<CurrentSession>,
    last_session: SessionId,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates an idle manager and returns it with a status receiver.
    pub fn new(
        transport: T,
        config: ConnectionConfig,
    ) -> (Self, watch::Receiver<ConnectionStatus>) {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let mgr = Self {
            transport,
            config,
            current: None,
            last_session: SessionId(0),
            status_tx,
        };
        (mgr, status_rx)
    }

    /// Opens a new session to `address`, closing the current one first.
    ///
    /// Returns the id of the new session.  Calling this twice in a row with
    /// the same address leaves exactly one live session: the first is closed
    /// before the second is opened and its later events are ignored.
    pub fn connect(&mut self, address: Address) -> SessionId {
        self.close_current();

        let id = self.last_session.next();
        self.last_session = id;

        let url = address.ws_url(self.config.port);
        info!("session {id}: connecting to {url}");
        self.transport.open(id, &url);

        self.current = Some(CurrentSession {
            id,
            address,
            closed: false,
        });
        id
    }

    /// Applies one transport event.
    ///
    /// Returns a [`RetryTask`] when the event was the close of the current
    /// session; the caller is responsible for waiting `task.delay` and then
    /// calling [`ConnectionManager::on_retry_due`].
    pub fn handle_event(&mut self, event: SessionEvent) -> Option<RetryTask> {
        let SessionEvent { session, event } = event;

        let current = match self.current.as_mut() {
            Some(current) if current.id == session => current,
            _ => {
                debug!("session {session}: ignoring {event:?} from superseded session");
                return None;
            }
        };

        if current.closed {
            debug!("session {session}: ignoring {event:?} after close");
            return None;
        }

        match event {
            TransportEvent::Opened => {
                info!("session {session}: connected to {}", current.address);
                self.set_status(ConnectionStatus::Connected);
                None
            }
            TransportEvent::Error(err) => {
                // The transport always follows an error with a close, which
                // schedules the retry.
                warn!("session {session}: {err}");
                self.set_status(ConnectionStatus::ConnectionFailed);
                None
            }
            TransportEvent::Closed => {
                current.closed = true;
                let task = RetryTask {
                    session,
                    address: current.address.clone(),
                    delay: self.config.reconnect_delay,
                };
                info!(
                    "session {session}: disconnected; reconnecting in {:?}",
                    task.delay
                );
                self.set_status(ConnectionStatus::Disconnected);
                Some(task)
            }
        }
    }

    /// Runs a reconnect whose delay has elapsed.
    ///
    /// Returns `false` without touching the link if the task is stale, i.e.
    /// `connect` or `shutdown` was called after the task was scheduled.
    pub fn on_retry_due(&mut self, task: RetryTask) -> bool {
        let still_current = self
            .current
            .as_ref()
            .is_some_and(|c| c.id == task.session && c.closed);

        if !still_current {
            debug!(
                "session {}: dropping stale reconnect to {}",
                task.session, task.address
            );
            return false;
        }

        self.connect(task.address);
        true
    }

    /// Closes the current session and cancels any pending reconnect.
    pub fn shutdown(&mut self) {
        self.close_current();
        self.current = None;
    }

    /// The current status.
    pub fn current_status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// A new receiver that is notified whenever the status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Address of the current logical connection, if one was requested.
    pub fn address(&self) -> Option<&Address> {
        self.current.as_ref().map(|c| &c.address)
    }

    /// Id of the current session while it has not closed.
    pub fn live_session(&self) -> Option<SessionId> {
        self.current.as_ref().filter(|c| !c.closed).map(|c| c.id)
    }

    /// Consumes the manager and hands back its transport, e.g. to wait for
    /// sessions closed by [`shutdown`](Self::shutdown).
    pub fn into_transport(self) -> T {
        self.transport
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The send gate in front of this manager.
    pub fn commands(&mut self) -> CommandChannel<'_, T> {
        CommandChannel::new(self)
    }

    fn close_current(&mut self) {
        if let Some(current) = self.current.as_mut() {
            if !current.closed {
                debug!("session {}: closing superseded session", current.id);
                self.transport.close(current.id);
                current.closed = true;
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Publishes `status`, notifying observers only on an actual change.
    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
