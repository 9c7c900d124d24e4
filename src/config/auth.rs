//! Auth configuration
//!
//! The CLI has no identity of its own; this flag stands in for the host's
//! signed-in state when evaluating `{"auth": ...}` visibility conditions.

use genui::AuthState;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthConfig {
    /// Treat the viewer as signed in
    pub signed_in: bool,
}

/// Auth settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileAuth {
    pub signed_in: Option<bool>,
}

impl AuthConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileAuth>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            signed_in: file.signed_in.unwrap_or(false),
        }
    }

    pub fn state(&self) -> AuthState {
        AuthState {
            signed_in: self.signed_in,
        }
    }
}
