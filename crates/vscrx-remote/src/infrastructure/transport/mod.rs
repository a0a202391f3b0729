//! Transport implementations for the connection manager.
//!
//! - [`websocket::WebSocketTransport`] opens real `ws://` connections with
//!   tokio-tungstenite and reports lifecycle events on an unbounded channel.
//! - [`mock::MockTransport`] records every call so tests can inject synthetic
//!   events without a network.

pub mod mock;
pub mod websocket;

pub use mock::MockTransport;
pub use websocket::WebSocketTransport;
