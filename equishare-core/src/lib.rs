pub mod asset;
pub mod clock;
pub mod error;
pub mod id;
pub mod insurance;
pub mod locks;
pub mod offer;
pub mod participation;
pub mod tokenization;
pub mod transaction;

// Re-export the main types for convenience
pub use asset::{Asset, AssetRegistry, AssetStatus, Sex};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, LedgerError, StorageError};
pub use id::{
    AssetId, HolderId, IdGenerator, ObjectId, OfferId, SequentialIdGenerator, TokenizationId,
    TransactionId,
};
pub use insurance::{Guarantees, InsuranceInfo};
pub use locks::{LockGuard, LockInfo, LockKey, LockManager};
pub use offer::{Offer, OfferStatus};
pub use participation::Participation;
pub use tokenization::{NewTokenization, RiskRating, Tokenization, TokenizationStatus};
pub use transaction::{HashAnchor, PendingTransaction, Transaction, TransactionKind};
