//! The single task that owns the [`ConnectionManager`].
//!
//! # Architecture
//!
//! ```text
//!  RemoteHandle ──(Request)──────────┐
//!  Transport ────(SessionEvent)──────┼──► EventLoop::run ──► ConnectionManager
//!  retry timers ─(RetryTask)─────────┘          │
//!                                               └──► watch<ConnectionStatus>
//! ```
//!
//! Every state change happens on this one task, one message at a time, so the
//! manager needs no locks.  Callers talk to it through a cloneable
//! [`RemoteHandle`]; status observers hold a `watch` receiver and never block
//! the loop.
//!
//! Reconnect timers are plain `tokio::time::sleep` tasks that post the
//! [`RetryTask`] back onto the loop.  Whether a retry still applies is decided
//! by the manager when it arrives, so timers never need to be cancelled.

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};
use vscrx_core::{
    Address, CommandError, CommandToken, ConnectionStatus, SessionEvent, SessionId, Transport,
};

use crate::application::{ConnectionConfig, ConnectionManager, RetryTask};
use crate::infrastructure::transport::WebSocketTransport;

/// Capacity of the request queue between handles and the loop.
const REQUEST_QUEUE: usize = 32;

/// A request from a [`RemoteHandle`] to the loop.
#[derive(Debug)]
enum Request {
    Connect {
        address: Address,
        reply: oneshot::Sender<SessionId>,
    },
    Send {
        token: CommandToken,
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
    Address {
        reply: oneshot::Sender<Option<Address>>,
    },
    Shutdown,
}

/// The loop has exited, so the request could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection event loop has stopped")]
pub struct LoopStopped;

/// Cloneable front end to a running [`EventLoop`].
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    requests: mpsc::Sender<Request>,
    status: watch::Receiver<ConnectionStatus>,
}

impl RemoteHandle {
    /// Connects to `address`, replacing any current connection.
    ///
    /// Resolves once the loop has opened the new session, and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`LoopStopped`] if the loop has already exited.
    pub async fn connect(&self, address: Address) -> Result<SessionId, LoopStopped> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Connect { address, reply })
            .await
            .map_err(|_| LoopStopped)?;
        rx.await.map_err(|_| LoopStopped)
    }

    /// Sends `token` if the link is up right now.
    ///
    /// # Errors
    ///
    /// See [`crate::application::CommandChannel::send`].  A stopped loop is
    /// reported as [`CommandError::NotConnected`].
    pub async fn send(&self, token: CommandToken) -> Result<(), CommandError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Send { token, reply })
            .await
            .map_err(|_| CommandError::NotConnected)?;
        rx.await.map_err(|_| CommandError::NotConnected)?
    }

    /// Address of the current logical connection.
    pub async fn address(&self) -> Option<Address> {
        let (reply, rx) = oneshot::channel();
        self.requests.send(Request::Address { reply }).await.ok()?;
        rx.await.ok().flatten()
    }

    /// Status as of the last change the loop published.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// A receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Asks the loop to close the link and exit.  A loop that has already
    /// exited is not an error.
    pub async fn shutdown(&self) {
        let _ = self.requests.send(Request::Shutdown).await;
    }
}

/// Owns a [`ConnectionManager`] and feeds it requests, transport events, and
/// due retries.
pub struct EventLoop<T: Transport> {
    manager: ConnectionManager<T>,
    requests: mpsc::Receiver<Request>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    retry_tx: mpsc::UnboundedSender<RetryTask>,
    retry_rx: mpsc::UnboundedReceiver<RetryTask>,
}

impl<T: Transport> EventLoop<T> {
    /// Wraps `manager`.  `events` must be the receiving end of the channel
    /// the manager's transport reports on.
    pub fn new(
        manager: ConnectionManager<T>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
    ) -> (Self, RemoteHandle) {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_QUEUE);
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let handle = RemoteHandle {
            requests: req_tx,
            status: manager.subscribe(),
        };
        let event_loop = Self {
            manager,
            requests: req_rx,
            events,
            retry_tx,
            retry_rx,
        };
        (event_loop, handle)
    }

    /// Runs until [`RemoteHandle::shutdown`] is called or every handle is
    /// dropped.  Returns the manager so callers can inspect its final state.
    pub async fn run(mut self) -> ConnectionManager<T> {
        info!("connection event loop started");

        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Connect { address, reply }) => {
                        let session = self.manager.connect(address);
                        let _ = reply.send(session);
                    }
                    Some(Request::Send { token, reply }) => {
                        let result = self.manager.commands().send(&token);
                        let _ = reply.send(result);
                    }
                    Some(Request::Address { reply }) => {
                        let _ = reply.send(self.manager.address().cloned());
                    }
                    Some(Request::Shutdown) | None => {
                        self.manager.shutdown();
                        break;
                    }
                },
                Some(event) = self.events.recv() => {
                    if let Some(task) = self.manager.handle_event(event) {
                        self.schedule_retry(task);
                    }
                }
                Some(task) = self.retry_rx.recv() => {
                    self.manager.on_retry_due(task);
                }
            }
        }

        info!("connection event loop stopped");
        self.manager
    }

    fn schedule_retry(&self, task: RetryTask) {
        debug!("session {}: retry armed for {:?}", task.session, task.delay);
        let retry_tx = self.retry_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(task.delay).await;
            // Fails only once the loop has exited.
            let _ = retry_tx.send(task);
        });
    }
}

/// Builds an event loop whose manager speaks WebSocket.
pub fn websocket_event_loop(
    config: ConnectionConfig,
) -> (EventLoop<WebSocketTransport>, RemoteHandle) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (manager, _status) = ConnectionManager::new(WebSocketTransport::new(events_tx), config);
    EventLoop::new(manager, events_rx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use vscrx_core::{TransportError, TransportEvent};

    use crate::infrastructure::transport::MockTransport;

    struct Harness {
        handle: RemoteHandle,
        transport: MockTransport,
        events: mpsc::UnboundedSender<SessionEvent>,
        task: JoinHandle<ConnectionManager<MockTransport>>,
    }

    fn spawn_loop() -> Harness {
        let transport = MockTransport::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (manager, _rx) = ConnectionManager::new(transport.clone(), ConnectionConfig::default());
        let (event_loop, handle) = EventLoop::new(manager, events_rx);
        Harness {
            handle,
            transport,
            events: events_tx,
            task: tokio::spawn(event_loop.run()),
        }
    }

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    impl Harness {
        /// Injects `event` and waits until the loop has applied it.
        async fn inject(&self, session: u64, event: TransportEvent) {
            self.events
                .send(SessionEvent::new(SessionId(session), event))
                .unwrap();
            // A request round-trip orders us after the event.
            tokio::task::yield_now().await;
            self.handle.address().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_opens_session_and_status_follows_events() {
        // Arrange
        let h = spawn_loop();

        // Act
        let session = h.handle.connect(addr("10.0.0.5")).await.unwrap();
        h.inject(1, TransportEvent::Opened).await;

        // Assert
        assert_eq!(session, SessionId(1));
        assert_eq!(h.handle.status(), ConnectionStatus::Connected);
        assert_eq!(
            h.transport.opened(),
            vec![(SessionId(1), "ws://10.0.0.5:8080".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_through_handle_reaches_transport() {
        let h = spawn_loop();
        h.handle.connect(addr("10.0.0.5")).await.unwrap();
        h.inject(1, TransportEvent::Opened).await;

        let result = h.handle.send(CommandToken::new("reloadWindow").unwrap()).await;

        assert_eq!(result, Ok(()));
        assert_eq!(h.transport.sent(), vec![(SessionId(1), "reloadWindow".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_without_address_is_address_missing() {
        let h = spawn_loop();

        let result = h.handle.send(CommandToken::new("reloadWindow").unwrap()).await;

        assert_eq!(result, Err(CommandError::AddressMissing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_reconnects_after_two_seconds() {
        // Arrange
        let h = spawn_loop();
        h.handle.connect(addr("10.0.0.5")).await.unwrap();
        h.inject(1, TransportEvent::Opened).await;

        // Act
        h.inject(1, TransportEvent::Closed).await;
        assert_eq!(h.handle.status(), ConnectionStatus::Disconnected);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        h.handle.address().await;
        let before = h.transport.opened().len();

        tokio::time::sleep(Duration::from_millis(200)).await;
        h.handle.address().await;

        // Assert
        assert_eq!(before, 1, "must not reconnect before the delay");
        assert_eq!(
            h.transport.opened(),
            vec![
                (SessionId(1), "ws://10.0.0.5:8080".to_string()),
                (SessionId(2), "ws://10.0.0.5:8080".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_attempts_keep_retrying() {
        let h = spawn_loop();
        h.handle.connect(addr("10.0.0.5")).await.unwrap();

        for session in 1..=3 {
            let refused = TransportError::Connect("refused".into());
            h.inject(session, TransportEvent::Error(refused)).await;
            assert_eq!(h.handle.status(), ConnectionStatus::ConnectionFailed);
            h.inject(session, TransportEvent::Closed).await;
            tokio::time::sleep(Duration::from_millis(2100)).await;
            h.handle.address().await;
        }

        assert_eq!(h.transport.opened().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_for_replaced_address_is_dropped() {
        // Arrange: session 1 to A closes and arms a retry.
        let h = spawn_loop();
        h.handle.connect(addr("10.0.0.5")).await.unwrap();
        h.inject(1, TransportEvent::Closed).await;

        // Act: the user switches to B before the retry fires.
        tokio::time::sleep(Duration::from_millis(500)).await;
        h.handle.connect(addr("10.0.0.6")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        h.handle.address().await;

        // Assert
        assert_eq!(
            h.transport.opened(),
            vec![
                (SessionId(1), "ws://10.0.0.5:8080".to_string()),
                (SessionId(2), "ws://10.0.0.6:8080".to_string()),
            ]
        );
        assert_eq!(h.handle.address().await, Some(addr("10.0.0.6")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop_and_closes_session() {
        // Arrange
        let h = spawn_loop();
        h.handle.connect(addr("10.0.0.5")).await.unwrap();
        h.inject(1, TransportEvent::Opened).await;

        // Act
        h.handle.shutdown().await;
        let manager = h.task.await.unwrap();

        // Assert
        assert_eq!(manager.current_status(), ConnectionStatus::Disconnected);
        assert_eq!(h.transport.closed(), vec![SessionId(1)]);
        assert_eq!(
            h.handle.send(CommandToken::new("reloadWindow").unwrap()).await,
            Err(CommandError::NotConnected)
        );
        assert_eq!(h.handle.connect(addr("10.0.0.5")).await, Err(LoopStopped));
    }
}
