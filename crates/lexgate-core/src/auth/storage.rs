//! Storage backends for the single persisted credential slot.
//!
//! Every backend holds at most one opaque string under [`AUTH_TOKEN_KEY`].
//! The backend is chosen once at startup from [`StorageKind`]; the token
//! store never branches on which one it got.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Well-known key the credential is stored under.
pub const AUTH_TOKEN_KEY: &str = "auth-token";

/// Keychain service name
const SERVICE_NAME: &str = "lexgate";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse session file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Unknown storage backend: {0}")]
    UnknownKind(String),
}

/// One string slot with interior mutability.
pub trait SlotStorage: Send + Sync {
    fn read(&self) -> Result<Option<String>, StorageError>;
    fn write(&self, value: &str) -> Result<(), StorageError>;
    fn remove(&self) -> Result<(), StorageError>;

    /// False for the absent capability, where nothing is ever persisted.
    fn is_available(&self) -> bool {
        true
    }
}

/// Which backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    File,
    Keyring,
    None,
}

impl StorageKind {
    /// Open the backend. `cache_dir` is only used by [`StorageKind::File`].
    pub fn open(self, cache_dir: &Path) -> Result<Arc<dyn SlotStorage>, StorageError> {
        debug!(kind = ?self, "Opening credential storage");
        let storage: Arc<dyn SlotStorage> = match self {
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
            StorageKind::File => Arc::new(FileStorage::new(cache_dir.to_path_buf())),
            StorageKind::Keyring => Arc::new(KeyringStorage::new()?),
            StorageKind::None => Arc::new(Unavailable),
        };
        Ok(storage)
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "file" => Ok(StorageKind::File),
            "keyring" | "keychain" => Ok(StorageKind::Keyring),
            "none" => Ok(StorageKind::None),
            other => Err(StorageError::UnknownKind(other.to_string())),
        }
    }
}

/// Process-local slot. Used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a raw value directly into the slot, bypassing format checks.
    pub fn with_value(value: &str) -> Self {
        Self {
            slot: Mutex::new(Some(value.to_string())),
        }
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn write(&self, value: &str) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSlot {
    #[serde(rename = "auth-token")]
    token: String,
    stored_at: DateTime<Utc>,
}

/// Slot persisted as `session.json` in the cache directory.
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl SlotStorage for FileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let stored: StoredSlot = serde_json::from_str(&contents)?;
        Ok(Some(stored.token))
    }

    fn write(&self, value: &str) -> Result<(), StorageError> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredSlot {
            token: value.to_string(),
            stored_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Slot kept in the OS keychain.
pub struct KeyringStorage {
    entry: Entry,
}

impl KeyringStorage {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            entry: Entry::new(SERVICE_NAME, AUTH_TOKEN_KEY)?,
        })
    }
}

impl SlotStorage for KeyringStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, value: &str) -> Result<(), StorageError> {
        self.entry.set_password(value)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// No persistence available (headless or sandboxed host). Reads are always
/// empty; writes and removes succeed without effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl SlotStorage for Unavailable {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn write(&self, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }
}
