//! # Credential Storage
//!
//! Durable persistence of the single current credential.
//!
//! Every other component depends on the [`CredentialStore`] trait, never on
//! a concrete medium. Store failures are not observable to callers: an
//! unreadable or corrupted record reads as "no credential".

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::credential::Credential;

/// Key/value persistence of one bearer credential.
pub trait CredentialStore: Send + Sync {
    /// The persisted credential, if any.
    fn get(&self) -> Option<Credential>;

    /// Replace the persisted credential.
    fn set(&self, credential: Credential);

    /// Remove the persisted credential. Succeeds when nothing is stored.
    fn clear(&self);
}

/// Process-local store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `credential`.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    fn set(&self, credential: Credential) {
        *self.credential.write() = Some(credential);
    }

    fn clear(&self) {
        *self.credential.write() = None;
    }
}

/// On-disk record. Absence of the file means "no session".
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    access_token: String,
}

/// Store backed by a small JSON file that survives restarts.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store the credential at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<config_dir>/lakehouse/session.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lakehouse").join("session.json"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, record: &SessionRecord) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create session directory: {e}"))?;
        }

        let contents = serde_json::to_string(record)
            .map_err(|e| format!("Failed to serialize session: {e}"))?;
        fs::write(&self.path, contents).map_err(|e| format!("Failed to write session: {e}"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| format!("Failed to restrict session file: {e}"))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str::<SessionRecord>(&contents) {
            Ok(record) if !record.access_token.is_empty() => {
                Some(Credential::new(record.access_token))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Session file is corrupted");
                None
            }
        }
    }

    fn set(&self, credential: Credential) {
        let record = SessionRecord {
            access_token: credential.as_str().to_string(),
        };
        if let Err(e) = self.write(&record) {
            tracing::warn!(path = ?self.path, "{}", e);
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = ?self.path, "Removed session file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = ?self.path, error = %e, "Failed to remove session file"),
        }
    }
}
