pub mod address_store;
pub mod config;

pub use address_store::{AddressStore, MemoryAddressStore, TomlAddressStore};
pub use config::{AppConfig, ConfigError, ConnectionSettings};
