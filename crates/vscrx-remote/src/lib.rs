//! vscrx-remote library crate.
//!
//! A remote control for VS Code: keeps one WebSocket open to an editor-side
//! listener at `ws://<address>:8080`, reconnects two seconds after every drop,
//! and sends single-token editor commands over it.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! UI / CLI
//!    ↕
//! [vscrx-remote]
//!   ├── application/      ConnectionManager, CommandChannel (no I/O)
//!   └── infrastructure/
//!         ├── transport/  tokio-tungstenite WebSocket + mock
//!         ├── storage/    TOML config, saved address
//!         ├── event_loop  single task that owns the manager
//!         └── ui_bridge/  DTO commands for the screens
//!    ↕
//! editor-side listener (plain text frames over WebSocket)
//! ```
//!
//! # Layer rules
//!
//! - `vscrx-core` holds the pure types and the `Transport` trait.
//! - `application` depends on `vscrx-core` and `tokio::sync::watch` only.
//!   Its unit tests borrow `infrastructure::transport::mock::MockTransport`.
//! - `infrastructure` depends on everything else.

/// Application layer: connection lifecycle and the send gate.
pub mod application;

/// Infrastructure layer: sockets, config files, the event loop, and the UI bridge.
pub mod infrastructure;
