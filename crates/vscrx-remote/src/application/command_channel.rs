//! CommandChannel: the send gate in front of [`ConnectionManager`].
//!
//! A command is written only if, at the instant of the call, the manager
//! reports `Connected` *and* the transport says the session is writable.  In
//! every other case the command is dropped and the caller gets an error to
//! show the user.  Nothing is queued and nothing is retried; the user presses
//! the button again once the link is back.

use tracing::{info, warn};
use vscrx_core::{CommandError, CommandToken, EditorCommand, Transport};

use super::connection_manager::ConnectionManager;

/// Borrowing wrapper that sends command tokens over the manager's session.
///
/// Obtain one with [`ConnectionManager::commands`].
pub struct CommandChannel<'a, T: Transport> {
    manager: &'a mut ConnectionManager<T>,
}

impl<'a, T: Transport> CommandChannel<'a, T> {
    pub fn new(manager: &'a mut ConnectionManager<T>) -> Self {
        Self { manager }
    }

    /// Sends `token` as one text frame.
    ///
    /// # Errors
    ///
    /// - [`CommandError::AddressMissing`] if no address was ever configured.
    /// - [`CommandError::NotConnected`] if the link is down, the transport is
    ///   not writable, or the write itself was refused.
    pub fn send(&mut self, token: &CommandToken) -> Result<(), CommandError> {
        if self.manager.address().is_none() {
            warn!("command {token} dropped: no address configured");
            return Err(CommandError::AddressMissing);
        }

        let status = self.manager.current_status();
        let session = match self.manager.live_session() {
            Some(session) if status.is_connected() => session,
            _ => {
                warn!("command {token} dropped: link is {status}");
                return Err(CommandError::NotConnected);
            }
        };

        let transport = self.manager.transport_mut();
        if !transport.is_writable(session) {
            warn!("command {token} dropped: session {session} is not writable");
            return Err(CommandError::NotConnected);
        }

        transport
            .send_text(session, token.as_str())
            .map_err(|e| {
                warn!("command {token} dropped: {e}");
                CommandError::NotConnected
            })?;

        info!("session {session}: sent command {token}");
        Ok(())
    }

    /// Sends the wire token of `command`.
    pub fn send_command(&mut self, command: EditorCommand) -> Result<(), CommandError> {
        self.send(&CommandToken::from(command))
    }
}
