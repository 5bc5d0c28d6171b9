//! Relay configuration.
//!
//! Settings come from, lowest to highest precedence: built-in defaults, a
//! TOML file, the `PARLEY_BIND` environment variable and the `--bind` flag.
//! The file and flag handling live in the binary; this module only knows how
//! to parse and merge.
//!
//! ```toml
//! bind = "127.0.0.1:8091"
//! announce_rejected_departures = false
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Port the relay listens on when nothing else is configured.
pub const DEFAULT_PORT: u16 = 8091;

/// Address the relay listens on when nothing else is configured.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT);

/// Environment variable overriding the listen address.
pub const BIND_ENV_VAR: &str = "PARLEY_BIND";

/// Relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address.
    pub bind: SocketAddr,

    /// Announce "<name>: has left our chat..." for clients whose name was
    /// rejected. Off by default, so a rejected client never shows up in a
    /// broadcast.
    pub announce_rejected_departures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            announce_rejected_departures: false,
        }
    }
}

impl Config {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Loads the file at `default_path()` if it exists, defaults otherwise.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `$XDG_CONFIG_HOME/parley/config.toml` (or the platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
    }

    /// Replaces the listen address with a user-supplied one.
    pub fn with_bind(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.bind = raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidAddress {
                value: raw.to_string(),
                error: e.to_string(),
            }
        })?;
        Ok(self)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Invalid config file {path}: {error}")]
    ParseFile { path: PathBuf, error: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("Invalid listen address '{value}': {error}")]
    InvalidAddress { value: String, error: String },
}
