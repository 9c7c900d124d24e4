//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        format!(
            r#"# genui configuration

# Generator endpoint used by `genui render` when no source is given
{endpoint}
# Default component catalog (.json or .toml)
{catalog}
# Timeout for generator requests (seconds)
request_timeout_secs = {timeout}

# Auth state for {{"auth": "signedIn"}} visibility conditions
[auth]
signed_in = {signed_in}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# File logging (JSON lines, in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            endpoint = self
                .endpoint
                .as_ref()
                .map(|url| format!("endpoint = {:?}", url))
                .unwrap_or_else(|| "# endpoint = \"http://localhost:3000/api/generate\"".to_string()),
            catalog = self
                .catalog
                .as_ref()
                .map(|path| format!("catalog = {:?}", path.display().to_string()))
                .unwrap_or_else(|| "# catalog = \"catalog.toml\"".to_string()),
            timeout = self.request_timeout_secs,
            signed_in = self.auth.signed_in,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
        )
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml())
    }
}
