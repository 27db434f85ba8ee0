//! Client configuration.
//!
//! # Example
//!
//! ```
//! use watchwire::ClientConfig;
//!
//! let config = ClientConfig::default()
//!     .with_socket_path("/tmp/watchman.sock")
//!     .with_max_depth(32);
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Result, WatchwireError};

/// Environment variable watchman exports with its socket path.
pub const SOCKET_ENV_VAR: &str = "WATCHMAN_SOCK";

/// Default maximum PDU payload size (1 GB).
pub const DEFAULT_MAX_PDU_SIZE: u64 = 1_073_741_824;

/// Default maximum nesting depth for skip/decode.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default initial request buffer capacity.
pub const DEFAULT_REQUEST_CAPACITY: usize = 4096;

/// Limits and location used by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Path of the daemon's Unix socket.
    pub socket_path: Option<PathBuf>,
    /// Largest payload accepted from the daemon.
    pub max_pdu_size: u64,
    /// Deepest nesting accepted while decoding or skipping.
    pub max_depth: usize,
    /// Initial capacity of request buffers.
    pub request_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Defaults, with the socket path taken from `WATCHMAN_SOCK` if set.
    pub fn from_env() -> Self {
        let socket_path = std::env::var_os(SOCKET_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self {
            socket_path,
            ..Self::default()
        }
    }

    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the socket path.
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Set the maximum accepted payload size.
    pub fn with_max_pdu_size(mut self, max_pdu_size: u64) -> Self {
        self.max_pdu_size = max_pdu_size;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the initial request buffer capacity.
    pub fn with_request_capacity(mut self, request_capacity: usize) -> Self {
        self.request_capacity = request_capacity;
        self
    }

    /// Reject limits that would make every exchange fail.
    pub fn validate(&self) -> Result<()> {
        if self.max_pdu_size == 0 {
            return Err(WatchwireError::Config(
                "max_pdu_size must be greater than 0".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(WatchwireError::Config(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured socket path, or a config error if none is set.
    pub fn require_socket_path(&self) -> Result<&PathBuf> {
        self.socket_path
            .as_ref()
            .ok_or_else(|| WatchwireError::Config("no socket path configured".to_string()))
    }
}
