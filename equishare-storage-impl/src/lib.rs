pub mod lock_manager;
pub mod memory;
pub mod storage_traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the main types for convenience
pub use storage_traits::{
    LedgerBatch, LedgerStorage, OfferWrite, PageRequest, TokenizationFilter, TokenizationWrite,
};

pub use lock_manager::InProcessLockManager;
pub use memory::{InMemoryAssetRegistry, InMemoryStorage};

// Re-export the storage implementations
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
