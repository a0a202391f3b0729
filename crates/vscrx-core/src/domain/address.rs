//! The peer address the remote connects to.
//!
//! An [`Address`] is whatever the user typed into the settings screen, usually
//! a LAN IPv4 address such as `192.168.1.100`.  It names a host only; the
//! port is fixed and appended when the WebSocket URL is built.
//!
//! The only validation performed is non-emptiness.  Anything else (bad
//! hostnames, unreachable IPs) surfaces later as a transport error and is
//! handled by the reconnect loop.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TCP port the editor-side listener accepts WebSocket connections on.
pub const DEFAULT_PORT: u16 = 8080;

/// Error returned when an address cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// No address has been configured (empty or whitespace-only input).
    #[error("no address configured")]
    Missing,
}

/// A non-empty host name or IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validates `raw` and wraps it.
    ///
    /// Surrounding whitespace is trimmed, since addresses are typed on a
    /// phone keyboard and often pick up a trailing space.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Missing`] if nothing remains after trimming.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vscrx_core::Address;
    ///
    /// let addr = Address::parse(" 10.0.0.5 ").unwrap();
    /// assert_eq!(addr.as_str(), "10.0.0.5");
    /// assert!(Address::parse("   ").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Missing);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Like [`Address::parse`] but treats `None` as missing too.
    ///
    /// Convenient for values read from the address store.
    pub fn from_optional(raw: Option<&str>) -> Result<Self, AddressError> {
        raw.map_or(Err(AddressError::Missing), Self::parse)
    }

    /// The host string as entered (trimmed).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the WebSocket URL for this host, e.g. `ws://10.0.0.5:8080`.
    pub fn ws_url(&self, port: u16) -> String {
        format!("ws://{}:{}", self.0, port)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_ipv4_address() {
        // Arrange / Act
        let addr = Address::parse("192.168.1.100").unwrap();

        // Assert
        assert_eq!(addr.as_str(), "192.168.1.100");
    }

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        let addr = Address::parse("  10.0.0.5\n").unwrap();
        assert_eq!(addr.as_str(), "10.0.0.5");
    }

    #[test]
    fn test_parse_rejects_empty_string() {
        assert_eq!(Address::parse(""), Err(AddressError::Missing));
    }

    #[test]
    fn test_parse_rejects_whitespace_only() {
        assert_eq!(Address::parse(" \t "), Err(AddressError::Missing));
    }

    #[test]
    fn test_parse_accepts_hostname() {
        // No validation beyond non-emptiness: hostnames pass through untouched.
        let addr = Address::parse("devbox.local").unwrap();
        assert_eq!(addr.to_string(), "devbox.local");
    }

    #[test]
    fn test_from_optional_none_is_missing() {
        assert_eq!(Address::from_optional(None), Err(AddressError::Missing));
    }

    #[test]
    fn test_from_optional_some_parses() {
        let addr = Address::from_optional(Some("10.0.0.5")).unwrap();
        assert_eq!(addr.as_str(), "10.0.0.5");
    }

    #[test]
    fn test_ws_url_uses_fixed_default_port() {
        let addr = Address::parse("10.0.0.5").unwrap();
        assert_eq!(addr.ws_url(DEFAULT_PORT), "ws://10.0.0.5:8080");
    }

    #[test]
    fn test_deserialize_rejects_empty_address() {
        let result: Result<Address, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_is_plain_string() {
        let addr = Address::parse("10.0.0.5").unwrap();
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"10.0.0.5\"");
    }
}
