//! # vscrx-core
//!
//! Shared library for VS Code Remote containing the domain vocabulary of the
//! connection core: where to connect, what state the link is in, and which
//! command tokens may travel over it.
//!
//! It has zero dependencies on sockets, timers, or async runtimes.
//!
//! # Architecture overview
//!
//! VS Code Remote turns a handheld device into a remote control for a desktop
//! editor.  The device keeps one WebSocket open to a listener running inside
//! the editor and sends it single text frames such as `reloadWindow`.
//!
//! - **`domain`** – Plain value types: [`Address`], [`ConnectionStatus`],
//!   [`CommandToken`] and the fixed [`EditorCommand`] vocabulary.
//!
//! - **`session`** – Identity and lifecycle events of one socket session,
//!   plus the [`Transport`] trait that the connection manager drives.  Real
//!   sockets and test doubles both live behind this trait.

pub mod domain;
pub mod session;

pub use domain::address::{Address, AddressError, DEFAULT_PORT};
pub use domain::command::{CommandError, CommandToken, EditorCommand};
pub use domain::status::ConnectionStatus;
pub use session::{SessionEvent, SessionId, Transport, TransportError, TransportEvent};
