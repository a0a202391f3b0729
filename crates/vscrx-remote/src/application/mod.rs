//! Application layer use cases for the remote.
//!
//! Use cases in this layer depend on the [`vscrx_core::Transport`] trait
//! rather than on a concrete socket, and contain no network or file I/O.
//! They run to completion synchronously: the event loop in
//! `infrastructure::event_loop` calls into them one event at a time.
//!
//! # Sub-modules
//!
//! - **`connection_manager`** – Owns the single current session, turns
//!   transport events into [`vscrx_core::ConnectionStatus`] transitions, and
//!   produces reconnect tasks when the link drops.
//!
//! - **`command_channel`** – The send gate: forwards a command token only
//!   while the link is up, and reports `NotConnected` otherwise.

pub mod command_channel;
pub mod connection_manager;

pub use command_channel::CommandChannel;
pub use connection_manager::{ConnectionConfig, ConnectionManager, RetryTask};
