//! The token store: sole owner of the persisted bearer credential.
//!
//! Writes check shape only. Every read re-checks shape and expiry, and a
//! stored value that fails either check is purged on the spot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::storage::{MemoryStorage, SlotStorage, StorageError};
use super::token::{self, Credential, TokenError, Validity};

/// What a read found in the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Nothing stored.
    Empty,
    /// A credential that is valid right now.
    Valid(Credential),
    /// Something was stored but failed validation and has been purged.
    Purged(Validity),
}

impl Lookup {
    pub fn into_credential(self) -> Option<Credential> {
        match self {
            Lookup::Valid(credential) => Some(credential),
            Lookup::Empty | Lookup::Purged(_) => None,
        }
    }
}

pub struct TokenStore {
    storage: Arc<dyn SlotStorage>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SlotStorage>, clock: Arc<dyn Clock>) -> Self {
        if !storage.is_available() {
            warn!("Credential storage unavailable; sessions will not persist");
        }
        Self { storage, clock }
    }

    /// An isolated, empty store on the system clock.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    /// Store `raw`, replacing any prior credential.
    ///
    /// Only the segment count is checked. A malformed value leaves the
    /// current slot untouched.
    pub fn persist(&self, raw: &str) -> Result<(), TokenError> {
        if let Err(e) = token::check_format(raw) {
            warn!(error = %e, "Refusing to store malformed credential");
            return Err(e);
        }

        self.storage.write(raw)?;
        debug!(expires_at = ?token::expiry_of(raw), "Credential stored");
        Ok(())
    }

    /// The current credential, if one is stored and valid right now.
    pub fn retrieve(&self) -> Option<Credential> {
        self.lookup().into_credential()
    }

    /// Like [`retrieve`](Self::retrieve), but reports whether an invalid
    /// value was found and purged.
    pub fn lookup(&self) -> Lookup {
        let raw = match self.storage.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Empty,
            Err(StorageError::Parse(e)) => {
                warn!(error = %e, "Stored credential slot is unreadable, purging");
                self.purge();
                return Lookup::Purged(Validity::Malformed);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                return Lookup::Empty;
            }
        };

        match token::evaluate(&raw, self.clock.now_secs()) {
            Ok(credential) => Lookup::Valid(credential),
            Err(validity) => {
                info!(?validity, "Stored credential rejected, purging");
                self.purge();
                Lookup::Purged(validity)
            }
        }
    }

    /// Remove the stored credential. Purging an empty store is a no-op.
    pub fn purge(&self) {
        if let Err(e) = self.storage.remove() {
            warn!(error = %e, "Failed to remove stored credential");
        }
    }

    /// Expiry of any credential string, stored or not. Diagnostic only.
    pub fn expiry_of(&self, raw: &str) -> Option<DateTime<Utc>> {
        token::expiry_of(raw)
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_available()
    }

    /// End of the store's life: purge and drop.
    pub fn teardown(self) {
        self.purge();
    }
}
