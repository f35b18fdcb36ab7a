//! Server configuration
//!
//! Loaded from an optional TOML file. Missing keys fall back to defaults, so
//! an empty file and no file behave the same.
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:8000"
//! log_json = true
//!
//! [service]
//! evaluation = "suppress"
//!
//! [service.wait]
//! max_attempts = 30
//! interval_ms = 1000
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sheetsync_core::ServiceConfig;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings
    pub server: ListenConfig,
    /// Workbook service settings
    pub service: ServiceConfig,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Address to bind
    pub addr: SocketAddr,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file, or defaults when no file is given
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file is unreadable or malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed input.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.server.addr = addr;
        self
    }

    /// With JSON log output
    #[inline]
    #[must_use]
    pub fn with_log_json(mut self, log_json: bool) -> Self {
        self.server.log_json = log_json;
        self
    }
}
