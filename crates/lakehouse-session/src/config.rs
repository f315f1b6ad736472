//! # Configuration Persistence
//!
//! Save and load client settings to/from disk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::FileCredentialStore;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Lakehouse API, including the `/api` prefix.
    pub api_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where the session credential is persisted.
    ///
    /// Defaults to `session.json` next to the config file.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: default_timeout_secs(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Returns the default config file path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lakehouse").join("config.json"))
    }

    /// Loads configuration from the default path, or returns defaults.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("Could not determine config directory");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Loads configuration from `path`, or returns defaults if it is
    /// missing or unreadable.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(?path, "Loaded configuration");
                    config
                }
                Err(e) => {
                    tracing::warn!(?path, error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(?path, error = %e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Saves configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns a message if the directory cannot be created or the file
    /// cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e}"))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {e}"))?;

        fs::write(path, contents).map_err(|e| format!("Failed to write config: {e}"))?;

        tracing::info!(?path, "Saved configuration");
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved location of the session file.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .or_else(FileCredentialStore::default_path)
            .unwrap_or_else(|| PathBuf::from("lakehouse-session.json"))
    }
}
