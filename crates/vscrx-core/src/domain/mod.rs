//! Domain entities for VS Code Remote.
//!
//! Pure types with no I/O: the peer address, the observable link status, and
//! the command tokens sent to the editor.

pub mod address;
pub mod command;
pub mod status;
