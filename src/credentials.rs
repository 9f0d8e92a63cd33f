//! Local storage for the API key.
//!
//! One string under a fixed key. A stored key means authenticated, no key
//! means unauthenticated; there is no expiry or rotation.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

/// Key the API key is stored under.
pub const API_KEY_STORAGE_KEY: &str = "openai_api_key";

/// Errors from credential storage.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Reading or writing the backing file failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The backing file is not a JSON object of strings.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Whether a credential is present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// A key is stored.
    Authenticated,
    /// No key is stored.
    Unauthenticated,
}

/// Persistence for the single API key.
pub trait CredentialStore: Send + Sync {
    /// Stored key, if any.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> CredentialResult<Option<String>>;

    /// Store `api_key`, replacing any previous key.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, api_key: &str) -> CredentialResult<()>;

    /// Forget the stored key.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> CredentialResult<()>;

    /// Authentication state derived from the presence of a key.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn auth_state(&self) -> CredentialResult<AuthState> {
        Ok(if self.load()?.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        })
    }
}

/// JSON-file-backed store: `{ "openai_api_key": "<key>" }`.
///
/// Other keys found in the file are preserved on write.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store backed by the file at `path` (created on first save).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> CredentialResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> CredentialResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        // A leftover temp file would keep its old mode.
        remove_if_present(&tmp)?;
        let mut file = owner_only_options().open(&tmp)?;
        file.write_all(&serde_json::to_vec_pretty(entries)?)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Truncating write options; on unix the file is created `0o600`.
fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> CredentialResult<Option<String>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(API_KEY_STORAGE_KEY)
            .filter(|key| !key.trim().is_empty())
            .cloned())
    }

    fn save(&self, api_key: &str) -> CredentialResult<()> {
        let mut entries = self.read_entries()?;
        entries.insert(API_KEY_STORAGE_KEY.to_string(), api_key.to_string());
        self.write_entries(&entries)?;
        info!(path = %self.path.display(), "API key saved");
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(API_KEY_STORAGE_KEY).is_none() {
            return Ok(());
        }

        if entries.is_empty() {
            remove_if_present(&self.path)?;
        } else {
            self.write_entries(&entries)?;
        }
        debug!(path = %self.path.display(), "API key cleared");
        Ok(())
    }
}

/// Process-local store; forgets the key on exit.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    api_key: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> CredentialResult<Option<String>> {
        Ok(self
            .api_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, api_key: &str) -> CredentialResult<()> {
        *self.api_key.lock().unwrap_or_else(PoisonError::into_inner) = Some(api_key.to_string());
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        *self.api_key.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
