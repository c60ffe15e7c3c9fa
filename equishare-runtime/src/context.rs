use std::sync::Arc;

use equishare_core::clock::Clock;
use equishare_core::error::LedgerError;
use equishare_core::id::IdGenerator;
use equishare_core::locks::{LockGuard, LockKey, LockManager};
use equishare_storage_impl::{LedgerBatch, LedgerStorage};

use crate::config::LedgerConfig;

/// Collaborators shared by every ledger component
#[derive(Clone)]
pub struct LedgerContext {
    pub storage: Arc<dyn LedgerStorage>,
    pub locks: Arc<dyn LockManager>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub config: Arc<LedgerConfig>,
}

impl LedgerContext {
    /// Enter the exclusive section for `key`. The section ends when the
    /// returned guard is dropped.
    pub fn lock(&self, key: LockKey, operation: &str) -> Result<LockGuard<'_>, LedgerError> {
        log::debug!("{} waiting for {}", operation, key);
        let guard = LockGuard::acquire(
            self.locks.as_ref(),
            key,
            operation,
            self.config.lock_timeout(),
        )?;
        Ok(guard)
    }

    /// Commit a batch built by one operation
    pub fn commit(&self, batch: LedgerBatch) -> Result<(), LedgerError> {
        self.storage.commit(batch)?;
        Ok(())
    }
}
