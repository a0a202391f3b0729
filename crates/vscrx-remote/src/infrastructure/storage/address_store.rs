//! Persistent storage for the editor address.
//!
//! The address is the only piece of state the remote keeps between runs.  It
//! is written under the `ws_ip` key of the config file and read once at
//! startup to resume the last connection.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::config::{load_config_from, save_config_to, ConfigError};

/// Key/value access to the saved editor address.
#[cfg_attr(test, mockall::automock)]
pub trait AddressStore {
    /// The saved address, or `None` if the user never saved one.
    fn get(&self) -> Result<Option<String>, ConfigError>;

    /// Replaces the saved address.
    fn set(&mut self, address: &str) -> Result<(), ConfigError>;
}

/// [`AddressStore`] backed by the TOML config file.
///
/// Every call re-reads the file so that other settings in it survive a save.
#[derive(Debug, Clone)]
pub struct TomlAddressStore {
    path: PathBuf,
}

impl TomlAddressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AddressStore for TomlAddressStore {
    fn get(&self) -> Result<Option<String>, ConfigError> {
        Ok(load_config_from(&self.path)?.ws_ip)
    }

    fn set(&mut self, address: &str) -> Result<(), ConfigError> {
        let mut config = load_config_from(&self.path)?;
        config.ws_ip = Some(address.to_string());
        save_config_to(&self.path, &config)?;
        debug!("saved address {address} to {}", self.path.display());
        Ok(())
    }
}

/// [`AddressStore`] that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryAddressStore {
    address: Option<String>,
}

impl MemoryAddressStore {
    pub fn new(address: Option<String>) -> Self {
        Self { address }
    }
}

impl AddressStore for MemoryAddressStore {
    fn get(&self) -> Result<Option<String>, ConfigError> {
        Ok(self.address.clone())
    }

    fn set(&mut self, address: &str) -> Result<(), ConfigError> {
        self.address = Some(address.to_string());
        Ok(())
    }
}
