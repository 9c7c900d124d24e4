//! Configuration for the genui CLI
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/genui/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod auth;
mod observability;
mod serialization;

#[cfg(test)]
mod tests;

pub use auth::{AuthConfig, FileAuth};
pub use observability::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default request timeout for generator endpoints
const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Generator endpoint used when `render` is given no source
    pub endpoint: Option<String>,

    /// Default catalog file (.json or .toml)
    pub catalog: Option<PathBuf>,

    /// Timeout for generator requests, in seconds
    pub request_timeout_secs: u64,

    /// Auth flag consulted by visibility conditions
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            catalog: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure; every field optional so partial files work
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub endpoint: Option<String>,
    pub catalog: Option<String>,
    pub request_timeout_secs: Option<u64>,

    /// Optional [auth] section
    pub auth: Option<FileAuth>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/genui/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("genui").join("config.toml"))
    }

    /// Load file config if it exists
    ///
    /// A missing file means defaults. A file that exists but does not parse is
    /// an error: a broken config should fail loudly rather than silently fall
    /// back to defaults.
    fn load_file_config() -> Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).with_context(|| {
                format!(
                    "Failed to parse {} (run `genui config --reset` to regenerate it)",
                    path.display()
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Result<Self> {
        let file = Self::load_file_config()?;
        Ok(Self::layered(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn layered(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // Endpoint: env > file > none
        let endpoint = env("GENUI_ENDPOINT")
            .or(file.endpoint)
            .filter(|s| !s.trim().is_empty());

        // Catalog: env > file > none
        let catalog = env("GENUI_CATALOG")
            .or(file.catalog)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let request_timeout_secs = file
            .request_timeout_secs
            .unwrap_or(defaults.request_timeout_secs);

        let mut auth = AuthConfig::from_file(file.auth);
        if let Some(signed_in) = env("GENUI_SIGNED_IN") {
            auth.signed_in = signed_in == "1" || signed_in.eq_ignore_ascii_case("true");
        }

        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(level) = env("GENUI_LOG_LEVEL") {
            logging.level = level;
        }

        Self {
            endpoint,
            catalog,
            request_timeout_secs,
            auth,
            logging,
        }
    }
}
