use std::collections::HashMap;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use equishare_core::error::StorageError;
use equishare_core::locks::{LockInfo, LockKey, LockManager};

/// Helper function to get the current timestamp in milliseconds
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Lock manager for a single process: one exclusive holder per key,
/// waiters parked on a condition variable until the key is released.
#[derive(Default)]
pub struct InProcessLockManager {
    held: Mutex<HashMap<LockKey, LockInfo>>,
    released: Condvar,
}

impl InProcessLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<LockKey, LockInfo>>, StorageError> {
        self.held
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock table poisoned: {}", e)))
    }
}

impl fmt::Debug for InProcessLockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held = self.held.lock().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("InProcessLockManager")
            .field("held", &held)
            .finish()
    }
}

impl LockManager for InProcessLockManager {
    fn acquire_lock(
        &self,
        key: &LockKey,
        holder: &str,
        timeout_ms: Option<u64>,
    ) -> Result<(), StorageError> {
        let started = Instant::now();
        let deadline = timeout_ms.map(|ms| started + Duration::from_millis(ms));
        let mut held = self.table()?;

        while held.contains_key(key) {
            held = match deadline {
                None => self
                    .released
                    .wait(held)
                    .map_err(|e| StorageError::Other(format!("Lock table poisoned: {}", e)))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        log::debug!("{} gave up waiting for {}", holder, key);
                        return Err(StorageError::LockTimeout {
                            key: key.to_string(),
                            waited_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    self.released
                        .wait_timeout(held, deadline - now)
                        .map_err(|e| StorageError::Other(format!("Lock table poisoned: {}", e)))?
                        .0
                }
            };
        }

        held.insert(
            *key,
            LockInfo {
                key: *key,
                holder: holder.to_string(),
                acquired_at: current_time_millis(),
                timeout_ms,
            },
        );
        Ok(())
    }

    fn release_lock(&self, key: &LockKey) -> Result<bool, StorageError> {
        let removed = self.table()?.remove(key).is_some();
        if removed {
            // Waiters on other keys re-check and go back to sleep
            self.released.notify_all();
        }
        Ok(removed)
    }

    fn get_lock_info(&self, key: &LockKey) -> Result<Option<LockInfo>, StorageError> {
        Ok(self.table()?.get(key).cloned())
    }

    fn held_locks(&self) -> Result<Vec<LockInfo>, StorageError> {
        Ok(self.table()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equishare_core::id::{AssetId, TokenizationId};
    use equishare_core::locks::LockGuard;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn tokenization_key(label: &str) -> LockKey {
        LockKey::Tokenization(TokenizationId::from_label(label))
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let manager = InProcessLockManager::new();
        let key = tokenization_key("a");
        {
            let guard = LockGuard::acquire(&manager, key, "buy", Some(100)).unwrap();
            assert_eq!(guard.key(), &key);
            let info = manager.get_lock_info(&key).unwrap().unwrap();
            assert_eq!(info.holder, "buy");
            assert_eq!(info.timeout_ms, Some(100));
        }
        assert!(manager.get_lock_info(&key).unwrap().is_none());
        assert!(manager.held_locks().unwrap().is_empty());
    }

    #[test]
    fn test_explicit_release() {
        let manager = InProcessLockManager::new();
        let key = tokenization_key("a");
        let mut guard = LockGuard::acquire(&manager, key, "offer", None).unwrap();
        assert!(guard.release().unwrap());
        assert!(!guard.release().unwrap());
        assert!(!manager.release_lock(&key).unwrap());
    }

    #[test]
    fn test_keys_are_independent() {
        let manager = InProcessLockManager::new();
        let _a = LockGuard::acquire(&manager, tokenization_key("a"), "buy", Some(10)).unwrap();
        let _b = LockGuard::acquire(&manager, tokenization_key("b"), "buy", Some(10)).unwrap();
        let _c = LockGuard::acquire(
            &manager,
            LockKey::Asset(AssetId::from_label("a")),
            "create",
            Some(10),
        )
        .unwrap();
        assert_eq!(manager.held_locks().unwrap().len(), 3);
    }

    #[test]
    fn test_timeout_while_held() {
        let manager = InProcessLockManager::new();
        let key = tokenization_key("a");
        let _held = LockGuard::acquire(&manager, key, "first", None).unwrap();

        let err = manager.acquire_lock(&key, "second", Some(20)).unwrap_err();
        match err {
            StorageError::LockTimeout { key: name, waited_ms } => {
                assert_eq!(name, key.to_string());
                assert!(waited_ms >= 20);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // The first holder is untouched
        assert_eq!(manager.get_lock_info(&key).unwrap().unwrap().holder, "first");
    }

    #[test]
    fn test_waiter_proceeds_after_release() {
        let manager = Arc::new(InProcessLockManager::new());
        let key = tokenization_key("a");
        manager.acquire_lock(&key, "first", None).unwrap();

        let waiter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.acquire_lock(&key, "second", Some(5_000)))
        };
        thread::sleep(Duration::from_millis(20));
        manager.release_lock(&key).unwrap();

        waiter.join().unwrap().unwrap();
        assert_eq!(manager.get_lock_info(&key).unwrap().unwrap().holder, "second");
    }

    #[test]
    fn test_sections_are_serialized() {
        let manager = Arc::new(InProcessLockManager::new());
        let key = tokenization_key("shared");
        // Non-atomic read-modify-write; only correct under mutual exclusion
        let counter = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _guard =
                            LockGuard::acquire(manager.as_ref(), key, "increment", None).unwrap();
                        let value = counter.load(Ordering::SeqCst);
                        thread::yield_now();
                        counter.store(value + 1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 400);
    }
}
