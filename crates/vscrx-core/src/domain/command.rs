//! Command tokens and the editor command vocabulary.
//!
//! A [`CommandToken`] is the entire payload of one WebSocket text frame.  The
//! remote never interprets it; the editor-side listener maps it to an editor
//! action.  The [`EditorCommand`] enum lists the tokens the listener is known
//! to understand, together with the button label shown for each.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a command could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No address has ever been configured, so there is no link to send on.
    #[error("IP address not set")]
    AddressMissing,
    /// The link is down (or not writable right now).  The command was dropped.
    #[error("WebSocket not connected.")]
    NotConnected,
    /// The token was empty.
    #[error("command token must not be empty")]
    EmptyToken,
}

/// An opaque, non-empty string naming a remote action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandToken(String);

impl CommandToken {
    /// Wraps `token`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::EmptyToken`] for an empty string.
    pub fn new(token: impl Into<String>) -> Result<Self, CommandError> {
        let token = token.into();
        if token.is_empty() {
            return Err(CommandError::EmptyToken);
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CommandToken {
    type Error = CommandError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommandToken> for String {
    fn from(value: CommandToken) -> Self {
        value.0
    }
}

impl From<EditorCommand> for CommandToken {
    fn from(cmd: EditorCommand) -> Self {
        Self(cmd.token().to_string())
    }
}

/// The editor actions exposed as buttons on the remote.
///
/// Variants are listed in button order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorCommand {
    OpenCommandPalette,
    OpenSourceControl,
    CloseTerminal,
    InsertBracesLeft,
    InsertBracesRight,
    InsertPipes,
    ReloadWindow,
}

impl EditorCommand {
    /// Every command, in button order.
    pub const ALL: [EditorCommand; 7] = [
        Self::OpenCommandPalette,
        Self::OpenSourceControl,
        Self::CloseTerminal,
        Self::InsertBracesLeft,
        Self::InsertBracesRight,
        Self::InsertPipes,
        Self::ReloadWindow,
    ];

    /// Wire token understood by the editor-side listener.
    pub fn token(self) -> &'static str {
        match self {
            Self::OpenCommandPalette => "openCommandPalette",
            Self::OpenSourceControl => "openSourceControl",
            Self::CloseTerminal => "closeTerminal",
            Self::InsertBracesLeft => "insertBracesLeft",
            Self::InsertBracesRight => "insertBracesRight",
            Self::InsertPipes => "insertPipes",
            Self::ReloadWindow => "reloadWindow",
        }
    }

    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenCommandPalette => "Command Palette",
            Self::OpenSourceControl => "Source Control",
            Self::CloseTerminal => "Close Terminal",
            Self::InsertBracesLeft => "Insert {",
            Self::InsertBracesRight => "Insert }",
            Self::InsertPipes => "Insert ||",
            Self::ReloadWindow => "Reload Window",
        }
    }

    /// Finds a command by its label, ignoring ASCII case.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_token_rejects_empty() {
        assert_eq!(CommandToken::new(""), Err(CommandError::EmptyToken));
    }

    #[test]
    fn test_command_token_is_opaque() {
        // Tokens outside the known vocabulary are still valid tokens.
        let token = CommandToken::new("workbench.action.toggleSidebar").unwrap();
        assert_eq!(token.as_str(), "workbench.action.toggleSidebar");
    }

    #[test]
    fn test_editor_command_tokens_match_vocabulary() {
        let tokens: Vec<&str> = EditorCommand::ALL.iter().map(|c| c.token()).collect();
        assert_eq!(
            tokens,
            [
                "openCommandPalette",
                "openSourceControl",
                "closeTerminal",
                "insertBracesLeft",
                "insertBracesRight",
                "insertPipes",
                "reloadWindow",
            ]
        );
    }

    #[test]
    fn test_from_label_ignores_case() {
        assert_eq!(
            EditorCommand::from_label("reload window"),
            Some(EditorCommand::ReloadWindow)
        );
        assert_eq!(
            EditorCommand::from_label("Insert ||"),
            Some(EditorCommand::InsertPipes)
        );
        assert_eq!(EditorCommand::from_label("Insert |"), None);
    }

    #[test]
    fn test_editor_command_converts_to_token() {
        let token: CommandToken = EditorCommand::InsertBracesLeft.into();
        assert_eq!(token.as_str(), "insertBracesLeft");
    }

    #[test]
    fn test_command_error_not_connected_message_is_user_facing() {
        assert_eq!(
            CommandError::NotConnected.to_string(),
            "WebSocket not connected."
        );
    }
}
