//! Infrastructure layer: everything that touches the network, the file
//! system, or the Tokio runtime.
//!
//! - **`transport`** – WebSocket and mock implementations of
//!   [`vscrx_core::Transport`].
//! - **`storage`** – TOML config file and the persisted editor address.
//! - **`event_loop`** – The task that owns the connection manager, and the
//!   cloneable handle used to talk to it.
//! - **`ui_bridge`** – DTO-level commands for a remote-control UI.

pub mod event_loop;
pub mod storage;
pub mod transport;
pub mod ui_bridge;

pub use event_loop::{websocket_event_loop, EventLoop, LoopStopped, RemoteHandle};
