use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;
use crate::id::{HolderId, TokenizationId, TransactionId};

/// Kind of supply-affecting event recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Locked tokens credited to the issuer at creation
    Issuance,
    /// Primary sale from the public pool
    DirectSale,
    /// Reserved: holder-to-holder transfer
    Transfer,
    /// Reserved: issuer buyback
    Buyback,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Issuance => "issuance",
            TransactionKind::DirectSale => "direct_sale",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Buyback => "buyback",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issuance" => Ok(TransactionKind::Issuance),
            "direct_sale" => Ok(TransactionKind::DirectSale),
            "transfer" => Ok(TransactionKind::Transfer),
            "buyback" => Ok(TransactionKind::Buyback),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

/// Hex-encoded SHA-256 anchor that uniquely identifies a journal entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HashAnchor(String);

impl HashAnchor {
    pub const PREFIX: &'static str = "0x";

    /// Anchor over `(tokenization, actor, quantity, unix seconds)`
    pub fn compute(
        tokenization_id: &TokenizationId,
        actor_id: &HolderId,
        quantity: u64,
        unix_timestamp: i64,
    ) -> Result<Self, StorageError> {
        let preimage = bincode::serialize(&(tokenization_id, actor_id, quantity, unix_timestamp))?;
        Ok(Self::from_preimage(&preimage))
    }

    /// Anchor re-derived with a collision nonce. Nonce 0 is the plain anchor.
    pub fn compute_with_nonce(
        tokenization_id: &TokenizationId,
        actor_id: &HolderId,
        quantity: u64,
        unix_timestamp: i64,
        nonce: u32,
    ) -> Result<Self, StorageError> {
        if nonce == 0 {
            return Self::compute(tokenization_id, actor_id, quantity, unix_timestamp);
        }
        let preimage = bincode::serialize(&(
            tokenization_id,
            actor_id,
            quantity,
            unix_timestamp,
            nonce,
        ))?;
        Ok(Self::from_preimage(&preimage))
    }

    fn from_preimage(preimage: &[u8]) -> Self {
        let digest = Sha256::digest(preimage);
        HashAnchor(format!("{}{}", Self::PREFIX, hex::encode(digest)))
    }

    /// Wrap an anchor read back from storage
    pub fn parse(value: &str) -> Result<Self, StorageError> {
        let digest = value.strip_prefix(Self::PREFIX).ok_or_else(|| {
            StorageError::Serialization(format!(
                "Hash anchor without {} prefix: {}",
                Self::PREFIX,
                value
            ))
        })?;
        if digest.len() != 64 || hex::decode(digest).is_err() {
            return Err(StorageError::Serialization(format!("Malformed hash anchor: {}", value)));
        }
        Ok(HashAnchor(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A journal entry before it has been anchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub tokenization_id: TokenizationId,
    pub seller_id: Option<HolderId>,
    pub buyer_id: HolderId,
    pub quantity: u64,
    pub unit_price: u64,
    pub kind: TransactionKind,
}

impl PendingTransaction {
    /// `quantity * unit_price`, or `None` on overflow
    pub fn total_value(&self) -> Option<u64> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// Immutable, append-only journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    pub tokenization_id: TokenizationId,

    /// `None` for primary issuance and sales from the public pool
    pub seller_id: Option<HolderId>,

    pub buyer_id: HolderId,

    pub quantity: u64,

    /// Unit price in minor currency units at execution time
    pub unit_price: u64,

    pub total_value: u64,

    pub kind: TransactionKind,

    /// Unique anchor over the entry's identifying fields
    pub hash_anchor: HashAnchor,

    pub created_at: DateTime<Utc>,
}
