//! Authentication module for the client-side bearer credential.
//!
//! This module provides:
//! - `TokenStore`: persistence, validation, expiry and purge of the credential
//! - `SlotStorage` backends: memory, session file, OS keychain, or none
//! - `AuthSession`: the anonymous/authenticated state container
//!
//! Validity is re-checked on every read; nothing caches a trust decision.

pub mod clock;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{AuthSession, AuthState};
pub use storage::{SlotStorage, StorageError, StorageKind, AUTH_TOKEN_KEY};
pub use store::{Lookup, TokenStore};
pub use token::{expiry_of, Claims, Credential, TokenError, Validity};
