use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StorageError;
use crate::id::{AssetId, TokenizationId};

/// What an exclusive section protects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKey {
    /// Serializes creation of the tokenization for an asset
    Asset(AssetId),
    /// Serializes every read-check-mutate sequence on a tokenization
    Tokenization(TokenizationId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Asset(id) => write!(f, "asset/{}", id),
            LockKey::Tokenization(id) => write!(f, "tokenization/{}", id),
        }
    }
}

/// Information about a held lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// The key being locked
    pub key: LockKey,

    /// Name of the operation holding the lock
    pub holder: String,

    /// When the lock was acquired (Unix timestamp, milliseconds)
    pub acquired_at: u64,

    /// How long the holder was prepared to wait for it (in milliseconds)
    pub timeout_ms: Option<u64>,
}

/// Exclusive, per-key lock manager.
///
/// Holding the lock for one key never blocks operations on another key.
pub trait LockManager: fmt::Debug + Send + Sync {
    /// Acquire the exclusive lock on `key`, waiting for the current holder
    ///
    /// # Parameters
    /// * `key` - What to lock
    /// * `holder` - Name of the operation acquiring the lock
    /// * `timeout_ms` - Maximum wait (in milliseconds); `None` waits indefinitely
    ///
    /// # Returns
    /// * `Ok(())` - The lock is now held by the caller
    /// * `Err(StorageError::LockTimeout)` - The wait exceeded `timeout_ms`
    fn acquire_lock(
        &self,
        key: &LockKey,
        holder: &str,
        timeout_ms: Option<u64>,
    ) -> Result<(), StorageError>;

    /// Release the lock on `key`
    ///
    /// # Returns
    /// * `Ok(true)` - The lock was released
    /// * `Ok(false)` - The key was not locked
    fn release_lock(&self, key: &LockKey) -> Result<bool, StorageError>;

    /// Check if a lock exists and get its information
    fn get_lock_info(&self, key: &LockKey) -> Result<Option<LockInfo>, StorageError>;

    /// All locks currently held
    fn held_locks(&self) -> Result<Vec<LockInfo>, StorageError>;
}

/// Guard that holds a lock and releases it when dropped
#[derive(Debug)]
pub struct LockGuard<'a> {
    /// Key that is locked
    key: LockKey,

    /// Reference to the lock manager
    manager: &'a dyn LockManager,

    /// Whether the lock has been explicitly released
    released: bool,
}

impl<'a> LockGuard<'a> {
    /// Acquire `key` through `manager` and return a guard for it
    pub fn acquire(
        manager: &'a dyn LockManager,
        key: LockKey,
        holder: &str,
        timeout_ms: Option<u64>,
    ) -> Result<Self, StorageError> {
        manager.acquire_lock(&key, holder, timeout_ms)?;
        Ok(Self {
            key,
            manager,
            released: false,
        })
    }

    /// Explicitly release the lock before the guard is dropped
    pub fn release(&mut self) -> Result<bool, StorageError> {
        if self.released {
            return Ok(false);
        }
        let released = self.manager.release_lock(&self.key)?;
        self.released = true;
        Ok(released)
    }

    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.manager.release_lock(&self.key) {
                log::warn!("Failed to release lock on {}: {}", self.key, e);
            }
        }
    }
}
