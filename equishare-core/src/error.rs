use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with ledger storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO errors that occur when reading/writing files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors that occur with the underlying storage backend
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A row referenced by a write does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A write would violate a uniqueness constraint
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// An exclusive section could not be entered in time
    #[error("Timed out after {waited_ms} ms waiting for lock on {key}")]
    LockTimeout { key: String, waited_ms: u64 },

    /// Generic errors that don't fit in other categories
    #[error("Other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::DuplicateKey(db.message().to_string())
            }
            _ => StorageError::Database(err.to_string()),
        }
    }
}

/// Caller-facing classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Persistence,
}

/// Errors returned by every ledger operation
#[derive(Error, Debug)]
pub enum LedgerError {
    /// An invariant or precondition was violated; nothing was written
    #[error("validation failed: {0}")]
    Validation(String),

    /// The asset, tokenization or offer does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The asset is already tokenized, or an anchor could not be made unique
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failure. The cause is kept as the error source and logged,
    /// but not rendered to callers.
    #[error("persistence failure")]
    Persistence(#[source] StorageError),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        LedgerError::Persistence(err)
    }
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        LedgerError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::Conflict(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Whether the message may be shown to the caller as-is
    pub fn is_caller_facing(&self) -> bool {
        self.kind() != ErrorKind::Persistence
    }
}
