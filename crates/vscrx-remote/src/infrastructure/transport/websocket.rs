//! WebSocket transport built on tokio-tungstenite.
//!
//! Each session runs in its own Tokio task:
//!
//! ```text
//! open(id, url) ──► spawn session task
//!                      │ connect_async(url)
//!                      ├── Err ──► Error, Closed
//!                      └── Ok  ──► Opened
//!                                   │ select! {
//!                                   │   outbound Text  → sink.send
//!                                   │   outbound Close → sink.close
//!                                   │   inbound frame  → ignored / Close
//!                                   │ }
//!                                   ▼
//!                           [Error,] Closed
//! ```
//!
//! The task never touches connection manager state.  It reports lifecycle
//! events on the channel passed to [`WebSocketTransport::new`], and receives
//! outbound frames on a per-session unbounded channel, so `send_text` and
//! `close` return immediately.
//!
//! Inbound frames are not part of the protocol (the editor never answers) and
//! are only logged.
//!
//! `close` only queues the close frame.  Call
//! [`WebSocketTransport::drain_sessions`] before the runtime goes away so the
//! closing handshakes actually reach the peer.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, warn};
use vscrx_core::{SessionEvent, SessionId, Transport, TransportError, TransportEvent};

/// How long a session waits for the closing handshake before dropping the socket.
const CLOSE_HANDSHAKE_WAIT: Duration = Duration::from_secs(2);

/// A frame queued for a session task.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

struct SessionHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Set by the session task between the handshake and the end of the session.
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// [`Transport`] that speaks WebSocket.
///
/// Must be used from inside a Tokio runtime because `open` spawns a task.
pub struct WebSocketTransport {
    events: mpsc::UnboundedSender<SessionEvent>,
    sessions: HashMap<SessionId, SessionHandle>,
    /// Tasks of closed sessions that may still be finishing their handshake.
    closing: Vec<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Creates a transport that reports lifecycle events on `events`.
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            sessions: HashMap::new(),
            closing: Vec::new(),
        }
    }

    /// Closes every session and waits up to `grace` for their tasks to end.
    ///
    /// Returns `false` if some task was still running when `grace` ran out.
    pub async fn drain_sessions(mut self, grace: Duration) -> bool {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.close(id);
        }

        let tasks = std::mem::take(&mut self.closing);
        let pending = tasks.len();
        let joined = timeout(grace, async move {
            for task in tasks {
                let _ = task.await;
            }
        })
        .await;

        match joined {
            Ok(()) => {
                debug!("drained {pending} session task(s)");
                true
            }
            Err(_) => {
                warn!("session tasks still running after {grace:?}; dropping them");
                false
            }
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, session: SessionId, url: &str) {
        // Forget sessions whose task already ended on its own.
        self.sessions.retain(|_, h| !h.task.is_finished());
        self.closing.retain(|task| !task.is_finished());

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_session(
            session,
            url.to_string(),
            self.events.clone(),
            outbound_rx,
            Arc::clone(&open),
        ));

        self.sessions.insert(
            session,
            SessionHandle {
                outbound: outbound_tx,
                open,
                task,
            },
        );
    }

    fn close(&mut self, session: SessionId) {
        if let Some(handle) = self.sessions.remove(&session) {
            handle.open.store(false, Ordering::Release);
            // The task may already be gone; then there is nothing to close.
            let _ = handle.outbound.send(Outbound::Close);
            self.closing.push(handle.task);
        }
    }

    fn is_writable(&self, session: SessionId) -> bool {
        self.sessions
            .get(&session)
            .is_some_and(|h| h.open.load(Ordering::Acquire) && !h.outbound.is_closed())
    }

    fn send_text(&mut self, session: SessionId, text: &str) -> Result<(), TransportError> {
        let handle = self
            .sessions
            .get(&session)
            .filter(|h| h.open.load(Ordering::Acquire))
            .ok_or(TransportError::NotOpen(session))?;

        handle
            .outbound
            .send(Outbound::Text(text.to_string()))
            .map_err(|_| TransportError::Socket(format!("session {session} writer has stopped")))
    }
}

/// Drives one WebSocket session from handshake to close.
async fn run_session(
    session: SessionId,
    url: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    open: Arc<AtomicBool>,
) {
    let emit = |event: TransportEvent| {
        // The receiver only goes away when the event loop has stopped.
        let _ = events.send(SessionEvent::new(session, event));
    };

    // ── Handshake ────────────────────────────────────────────────────────────
    //
    // Nothing can be written before `open` is set, so anything arriving on
    // `outbound` here is a close request (or the handle being dropped).
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = outbound.recv() => {
            debug!("session {session}: closed before handshake completed");
            emit(TransportEvent::Closed);
            return;
        }
    };

    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            emit(TransportEvent::Error(TransportError::Connect(e.to_string())));
            emit(TransportEvent::Closed);
            return;
        }
    };

    open.store(true, Ordering::Release);
    emit(TransportEvent::Opened);

    // ── Open session ─────────────────────────────────────────────────────────
    let (mut sink, mut stream) = ws_stream.split();

    let failure = loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(WsMessage::Text(text)).await {
                        break Some(TransportError::Socket(e.to_string()));
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!("session {session}: closing on request");
                    match sink.close().await {
                        Ok(()) => finish_close_handshake(session, &mut stream).await,
                        Err(e) => debug!("session {session}: close handshake failed: {e}"),
                    }
                    break None;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!("session {session}: peer closed ({frame:?})");
                    // tungstenite queues the reply and writes it on the next poll.
                    finish_close_handshake(session, &mut stream).await;
                    break None;
                }
                Some(Ok(other)) => {
                    debug!("session {session}: ignoring inbound frame ({} bytes)", other.len());
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    debug!("session {session}: stream ended");
                    break None;
                }
                Some(Err(e)) => {
                    warn!("session {session}: read failed: {e}");
                    break Some(TransportError::Socket(e.to_string()));
                }
            },
        }
    };

    open.store(false, Ordering::Release);
    if let Some(err) = failure {
        emit(TransportEvent::Error(err));
    }
    emit(TransportEvent::Closed);
}

/// Reads until the closing handshake is over, so the socket is not dropped
/// while a close frame is still in flight.
async fn finish_close_handshake<S>(session: SessionId, stream: &mut S)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let drained = timeout(CLOSE_HANDSHAKE_WAIT, async {
        while let Some(Ok(_)) = stream.next().await {}
    })
    .await;
    if drained.is_err() {
        debug!("session {session}: closing handshake not confirmed");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
