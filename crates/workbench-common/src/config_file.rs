//! Configuration file structures for the workbench.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`ServerConfigFile`]: HTTP server settings

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::WorkbenchConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [workbench.engine]
/// cache_dir = "./cache"
/// fuel_metering = false
///
/// [workbench.runtime]
/// bundle_url = "https://example.com/python.wasm"
/// preload_on_start = true
///
/// [workbench.remote]
/// client_id = "..."
/// client_secret = "..."
///
/// [workbench.remote.targets.cpp]
/// language = "cpp"
/// version_tag = "17"
///
/// [server]
/// bind_addr = "127.0.0.1:8080"
/// request_timeout_secs = 120
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Engine, runtime and remote settings.
    #[serde(default)]
    pub workbench: WorkbenchConfig,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfigFile,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML or fails
    /// validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        let runtime = &self.workbench.runtime;
        if runtime.bundle_path.is_none() {
            check_http_url("workbench.runtime.bundle_url", &runtime.bundle_url)?;
        }
        check_http_url("workbench.remote.endpoint", &self.workbench.remote.endpoint)?;

        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigFileError::Invalid {
                field: "server.bind_addr".into(),
                reason: format!("'{}' is not a socket address", self.server.bind_addr),
            });
        }

        Ok(())
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), ConfigFileError> {
    let url = Url::parse(value).map_err(|e| ConfigFileError::Invalid {
        field: field.into(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigFileError::Invalid {
            field: field.into(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// HTTP server configuration from config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfigFile {
    /// Bind address (e.g., "127.0.0.1:8080").
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,

    /// Request timeout in seconds.
    ///
    /// Covers the whole run, including a first-time runtime download.
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Enable graceful shutdown.
    #[serde(default = "defaults::graceful_shutdown")]
    pub graceful_shutdown: bool,
}

impl Default for ServerConfigFile {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            request_timeout_secs: defaults::request_timeout_secs(),
            graceful_shutdown: defaults::graceful_shutdown(),
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },

    /// A value parsed but is not usable.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

/// Default value functions for serde.
mod defaults {
    pub fn bind_addr() -> String {
        "127.0.0.1:8080".to_string()
    }

    pub const fn request_timeout_secs() -> u64 {
        600
    }

    pub const fn graceful_shutdown() -> bool {
        true
    }
}
