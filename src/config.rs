//! Global configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::models::endpoint::EndpointName;
use crate::{AppError, Result};

/// Endpoint name registered by the springboard daemon.
pub const DEFAULT_ENDPOINT_NAME: &str = "com.zjx.zxtouchd.springboard";

/// Default upper bound for a single message in either direction: 1 MiB.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1_048_576;

fn default_endpoint_name() -> EndpointName {
    EndpointName(DEFAULT_ENDPOINT_NAME.to_owned())
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

/// Global configuration parsed from `zxtouch-ipc.toml`.
///
/// Every key is optional; an empty file yields [`GlobalConfig::default`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct GlobalConfig {
    /// Endpoint both peers agree on.
    #[serde(default = "default_endpoint_name")]
    pub endpoint_name: EndpointName,
    /// Bounded wait for the client connect handshake.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Bounded wait for a reply after a request is sent.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Largest message accepted or sent on a channel.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            endpoint_name: default_endpoint_name(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Connect handshake timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reply wait timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a timeout or the message limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(AppError::Config(
                "connect_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(AppError::Config(
                "max_message_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
