//! Secure profile storage.
//!
//! The orchestrator treats the store as an opaque keyed blob container: it
//! only ever reads back what it wrote. [`MemorySecureStore`] covers tests and
//! hosts that manage persistence themselves; [`KeyringSecureStore`] (feature
//! `keyring`) persists through the platform credential store (macOS Keychain,
//! Windows Credential Manager, Linux Secret Service).
//!
//! Stores may be shared by unrelated orchestrator instances and keys; no
//! store-level locking is imposed beyond what the backend itself guarantees.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::error::AuthError;
use crate::types::Profile;

/// Error raised by a secure store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.0)
    }
}

/// Persistent storage for named profile blobs.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read the profile stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Profile>, StoreError>;

    /// Persist `profile` under `key`, replacing any previous value.
    async fn set(&self, key: &str, profile: &Profile) -> Result<(), StoreError>;

    /// Delete the profile under `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Whether anything is stored under `key`.
    async fn has_key(&self, key: &str) -> bool;
}

/// In-memory store; contents live as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySecureStore {
    entries: Arc<Mutex<HashMap<String, Profile>>>,
}

impl MemorySecureStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn get(&self, key: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, profile: &Profile) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), profile.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn has_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

/// Platform credential store backend. The profile is serialized to JSON and
/// stored as a single secret under `(service, key)`.
#[cfg(feature = "keyring")]
#[derive(Debug, Clone)]
pub struct KeyringSecureStore {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeyringSecureStore {
    /// Create a store namespaced by the given keyring service name.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, key).map_err(|err| StoreError(err.to_string()))
    }
}

#[cfg(feature = "keyring")]
#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn get(&self, key: &str) -> Result<Option<Profile>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(raw) => {
                let profile =
                    serde_json::from_str(&raw).map_err(|err| StoreError(err.to_string()))?;
                Ok(Some(profile))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(StoreError(err.to_string())),
        }
    }

    async fn set(&self, key: &str, profile: &Profile) -> Result<(), StoreError> {
        let raw = serde_json::to_string(profile).map_err(|err| StoreError(err.to_string()))?;
        self.entry(key)?.set_password(&raw).map_err(|err| StoreError(err.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(StoreError(err.to_string())),
        }
    }

    async fn has_key(&self, key: &str) -> bool {
        self.entry(key).is_ok_and(|entry| entry.get_password().is_ok())
    }
}
