//! Command bridge between a remote-control UI and the connection core.
//!
//! Follows the same layering as the rest of the crate: only this module knows
//! about both the event loop ([`RemoteHandle`]) and the address store, and the
//! UI only ever sees plain serializable DTOs.
//!
//! ```text
//! UI screen                    bridge                       core
//! ──────────────────────────────────────────────────────────────────────
//! Home      ── home_view() ──► NeedsAddress | Controls
//!           ── press(tok)  ──► RemoteHandle::send ───────► CommandChannel
//! Settings  ── save(ip)    ──► AddressStore::set, connect ► ConnectionManager
//! Status    ── get_status()──► watch<ConnectionStatus>
//! ```
//!
//! # `CommandResult<T>`
//!
//! Every command returns the same envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//! `error` always carries the exact text the UI should show to the user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use vscrx_core::{Address, CommandError, CommandToken, EditorCommand};

use crate::infrastructure::event_loop::RemoteHandle;
use crate::infrastructure::storage::AddressStore;

/// Shown on the home screen, and for presses, while no address is saved.
pub const ADDRESS_NOT_SET_NOTICE: &str =
    "IP address not set. Run `vscrx.showQr` in VS Code and enter the IP in Settings.";
/// Settings rejection for a blank address.
pub const EMPTY_ADDRESS_MESSAGE: &str = "IP address cannot be empty.";
/// Settings confirmation.
pub const ADDRESS_SAVED_MESSAGE: &str = "IP address saved!";

// ── Shared application state ──────────────────────────────────────────────────

/// Runtime state shared between bridge commands.
pub struct RemoteAppState {
    pub remote: RemoteHandle,
    /// Async mutex: the store is used from async handlers.
    pub store: Mutex<Box<dyn AddressStore + Send>>,
}

impl RemoteAppState {
    pub fn new(remote: RemoteHandle, store: impl AddressStore + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            remote,
            store: Mutex::new(Box::new(store)),
        })
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// Status line snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDto {
    /// `"Connected"`, `"Disconnected"`, or `"Connection Failed"`.
    pub connection_status: String,
    /// Address of the current connection, or empty.
    pub address: String,
}

/// Settings form contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDto {
    pub address: String,
}

/// One control button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonDto {
    pub label: String,
    pub token: String,
}

/// What the home screen should render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view")]
pub enum HomeViewDto {
    /// No address saved yet; send the user to settings.
    NeedsAddress { message: String },
    /// The control buttons, in display order.
    Controls { buttons: Vec<ButtonDto> },
}

/// Unified response wrapper for bridge commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Connects to the saved address, if there is one.
///
/// Called once at startup.  Returns the address that was restored.
pub async fn restore_saved_address(state: Arc<RemoteAppState>) -> CommandResult<Option<String>> {
    let saved = match state.store.lock().await.get() {
        Ok(saved) => saved,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let Some(address) = saved.as_deref().and_then(|raw| Address::parse(raw).ok()) else {
        info!("no saved address; waiting for one to be entered");
        return CommandResult::ok(None);
    };

    info!("restoring saved address {address}");
    if let Err(e) = state.remote.connect(address.clone()).await {
        return CommandResult::err(e.to_string());
    }
    CommandResult::ok(Some(address.into()))
}

/// Returns the current status snapshot.
pub async fn get_status(state: Arc<RemoteAppState>) -> CommandResult<StatusDto> {
    let address = state.remote.address().await;
    CommandResult::ok(StatusDto {
        connection_status: state.remote.status().to_string(),
        address: address.map(String::from).unwrap_or_default(),
    })
}

/// Decides between the address notice and the control buttons.
pub async fn home_view(state: Arc<RemoteAppState>) -> CommandResult<HomeViewDto> {
    let saved = match state.store.lock().await.get() {
        Ok(saved) => saved,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    if Address::from_optional(saved.as_deref()).is_err() {
        return CommandResult::ok(HomeViewDto::NeedsAddress {
            message: ADDRESS_NOT_SET_NOTICE.to_string(),
        });
    }

    let buttons = EditorCommand::ALL
        .iter()
        .map(|cmd| ButtonDto {
            label: cmd.label().to_string(),
            token: cmd.token().to_string(),
        })
        .collect();
    CommandResult::ok(HomeViewDto::Controls { buttons })
}

/// Returns the saved address for the settings form.
pub async fn get_settings(state: Arc<RemoteAppState>) -> CommandResult<SettingsDto> {
    match state.store.lock().await.get() {
        Ok(saved) => CommandResult::ok(SettingsDto {
            address: saved.unwrap_or_default(),
        }),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Validates, persists, and connects to the address from the settings form.
///
/// The address is saved before connecting, so a failed connection still
/// leaves it in place for the next launch.
pub async fn save_settings(
    state: Arc<RemoteAppState>,
    settings: SettingsDto,
) -> CommandResult<String> {
    let Ok(address) = Address::parse(&settings.address) else {
        return CommandResult::err(EMPTY_ADDRESS_MESSAGE);
    };

    {
        let mut store = state.store.lock().await;
        if let Err(e) = store.set(address.as_str()) {
            warn!("could not save address {address}: {e}");
            return CommandResult::err(e.to_string());
        }
    }

    if let Err(e) = state.remote.connect(address).await {
        return CommandResult::err(e.to_string());
    }
    CommandResult::ok(ADDRESS_SAVED_MESSAGE.to_string())
}

/// Presses one button: sends `token` if the link is up.
pub async fn press_command(state: Arc<RemoteAppState>, token: String) -> CommandResult<()> {
    let token = match CommandToken::new(token) {
        Ok(token) => token,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    match state.remote.send(token).await {
        Ok(()) => CommandResult::ok(()),
        Err(CommandError::AddressMissing) => CommandResult::err(ADDRESS_NOT_SET_NOTICE),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
