//! End-to-end tests against a real WebSocket peer on 127.0.0.1.
//!
//! The peer stands in for the editor-side listener: it accepts connections
//! with `tokio_tungstenite::accept_async`, forwards every text frame it
//! receives to the test, and in one case closes after the first frame.
//!
//! All waits are bounded by `timeout` so a regression fails instead of
//! hanging the test run.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use vscrx_core::{Address, CommandError, CommandToken, ConnectionStatus};
use vscrx_remote::application::ConnectionConfig;
use vscrx_remote::infrastructure::websocket_event_loop;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_status(rx: &mut watch::Receiver<ConnectionStatus>, want: ConnectionStatus) {
    timeout(WAIT, rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want}"))
        .expect("status channel closed");
}

fn token(s: &str) -> CommandToken {
    CommandToken::new(s).unwrap()
}

/// Spawns a peer that accepts any number of sessions and forwards every text
/// frame it receives.  Sessions stay open until the client closes them.
async fn spawn_peer() -> (u16, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frames_tx = frames_tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let _ = frames_tx.send(text);
                    }
                }
            });
        }
    });

    (port, frames_rx)
}

#[tokio::test]
async fn test_send_reaches_peer_and_reconnects_after_peer_close() {
    // Arrange: the first session is closed by the peer, the second is kept.
    let (port, mut frames) = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                frames_tx.send(text).unwrap();
            }
            ws.close(None).await.ok();

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    frames_tx.send(text).unwrap();
                }
            }
        });
        (port, frames_rx)
    };

    let config = ConnectionConfig {
        port,
        reconnect_delay: Duration::from_millis(300),
    };
    let (event_loop, remote) = websocket_event_loop(config);
    let loop_task = tokio::spawn(event_loop.run());
    let mut status = remote.subscribe();

    // Act: connect and press a button.
    remote.connect(Address::parse("127.0.0.1").unwrap()).await.unwrap();
    wait_for_status(&mut status, ConnectionStatus::Connected).await;
    remote.send(token("reloadWindow")).await.unwrap();

    // Assert: the peer saw exactly the token, then closed on us.
    let first = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
    assert_eq!(first, "reloadWindow");
    wait_for_status(&mut status, ConnectionStatus::Disconnected).await;

    // The link heals by itself and carries the next press.
    wait_for_status(&mut status, ConnectionStatus::Connected).await;
    remote.send(token("insertPipes")).await.unwrap();
    let second = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
    assert_eq!(second, "insertPipes");

    remote.shutdown().await;
    timeout(WAIT, loop_task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unreachable_editor_never_connects() {
    // Arrange: a port with nothing behind it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ConnectionConfig {
        port,
        reconnect_delay: Duration::from_millis(200),
    };
    let (event_loop, remote) = websocket_event_loop(config);
    tokio::spawn(event_loop.run());
    let mut status = remote.subscribe();

    // Act
    remote.connect(Address::parse("127.0.0.1").unwrap()).await.unwrap();

    // Assert: the failed attempt is published (the error and the close that
    // follows it land together, so only the change itself is observable).
    timeout(WAIT, status.changed())
        .await
        .expect("no status change after a refused connection")
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_ne!(remote.status(), ConnectionStatus::Connected);
    assert_eq!(
        remote.send(token("reloadWindow")).await,
        Err(CommandError::NotConnected)
    );
    assert_eq!(remote.address().await, Some(Address::parse("127.0.0.1").unwrap()));

    remote.shutdown().await;
}

#[tokio::test]
async fn test_new_address_replaces_pending_connection() {
    // Arrange: the first address is a documentation-range host that never
    // answers (or fails fast without a route); the second is a live peer.
    let (port, mut frames) = spawn_peer().await;
    let (event_loop, remote) = websocket_event_loop(ConnectionConfig {
        port,
        reconnect_delay: Duration::from_millis(200),
    });
    tokio::spawn(event_loop.run());
    let mut status = remote.subscribe();

    // Act
    let first = remote.connect(Address::parse("192.0.2.1").unwrap()).await.unwrap();
    let second = remote.connect(Address::parse("127.0.0.1").unwrap()).await.unwrap();

    // Assert
    assert_ne!(first, second);
    wait_for_status(&mut status, ConnectionStatus::Connected).await;
    assert_eq!(remote.address().await, Some(Address::parse("127.0.0.1").unwrap()));

    remote.send(token("openSourceControl")).await.unwrap();
    assert_eq!(
        timeout(WAIT, frames.recv()).await.unwrap().unwrap(),
        "openSourceControl"
    );

    remote.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_then_drain_sends_close_to_editor() {
    // Arrange: a peer that reports whether the session ended with a close
    // frame and without errors.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut saw_close = false;
        let mut errors = Vec::new();
        while let Some(item) = ws.next().await {
            match item {
                Ok(msg) => saw_close |= msg.is_close(),
                Err(e) => errors.push(e.to_string()),
            }
        }
        (saw_close, errors)
    });

    let (event_loop, remote) = websocket_event_loop(ConnectionConfig {
        port,
        reconnect_delay: Duration::from_millis(200),
    });
    let loop_task = tokio::spawn(event_loop.run());
    let mut status = remote.subscribe();
    remote.connect(Address::parse("127.0.0.1").unwrap()).await.unwrap();
    wait_for_status(&mut status, ConnectionStatus::Connected).await;

    // Act: the same exit path as the binary.
    remote.shutdown().await;
    let manager = timeout(WAIT, loop_task).await.unwrap().unwrap();
    let drained = manager.into_transport().drain_sessions(WAIT).await;

    // Assert
    assert!(drained);
    let (saw_close, errors) = timeout(WAIT, peer).await.unwrap().unwrap();
    assert!(saw_close);
    assert!(errors.is_empty(), "editor saw {errors:?}");
}
