use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::StorageError;

// ObjectId identifies every ledger entity (assets, holders, tokenizations,
// offers, transactions). It is a 32 byte domain-separated SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

/// Identifier of a registered asset (owned by the external asset registry)
pub type AssetId = ObjectId;
/// Identifier of an investor, issuer or seller
pub type HolderId = ObjectId;
/// Identifier of a tokenization header
pub type TokenizationId = ObjectId;
/// Identifier of a sell offer
pub type OfferId = ObjectId;
/// Identifier of a journal entry
pub type TransactionId = ObjectId;

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: the first 6 bytes are enough to tell ids apart in logs
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "obj:{}", prefix)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId([0; 32])
    }
}

impl Deref for ObjectId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ObjectId {
    pub fn new(uid: [u8; 32]) -> Self {
        ObjectId(uid)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Build an id from a byte slice read back from storage
    pub fn from_slice(bytes: &[u8]) -> Result<Self, StorageError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            StorageError::Serialization(format!("Invalid object id length: {}", bytes.len()))
        })?;
        Ok(ObjectId(array))
    }

    /// Full lowercase hex rendering (64 characters)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the full hex rendering produced by [`ObjectId::to_hex`]
    pub fn from_hex(value: &str) -> Result<Self, StorageError> {
        let bytes = hex::decode(value)
            .map_err(|e| StorageError::Serialization(format!("Invalid object id hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Derive an id from the given seeds
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"EQUISHARE_Object");

        for seed in seeds {
            hasher.update((seed.len() as u64).to_le_bytes());
            hasher.update(seed);
        }

        ObjectId(hasher.finalize().into())
    }

    /// Derive a stable id from a human readable label
    pub fn from_label(label: &str) -> Self {
        Self::derive(&[b"label", label.as_bytes()])
    }
}

/// Source of fresh identifiers for new ledger entities
pub trait IdGenerator: Send + Sync {
    /// Produce a new id. `kind` is mixed into the derivation so ids of
    /// different entity kinds never coincide.
    fn next_id(&self, kind: &str) -> ObjectId;
}

/// Deterministic generator: SHA-256 over a seed and a monotonically
/// increasing counter.
///
/// The counter starts at zero on every construction, so a fixed seed replays
/// the same ids. Against a persistent store, build the generator with
/// [`SequentialIdGenerator::from_system_time`] or a seed that is never reused
/// across restarts.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    seed: Vec<u8>,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(seed: &[u8]) -> Self {
        Self {
            seed: seed.to_vec(),
            counter: AtomicU64::new(0),
        }
    }

    /// Seed the generator from the wall clock and the process. Generators
    /// built this way never share a seed within one process.
    pub fn from_system_time() -> Self {
        static INSTANCES: AtomicU64 = AtomicU64::new(0);

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut seed = nanos.to_le_bytes().to_vec();
        seed.extend_from_slice(&std::process::id().to_le_bytes());
        seed.extend_from_slice(&INSTANCES.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        Self::new(&seed)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, kind: &str) -> ObjectId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        ObjectId::derive(&[&self.seed, kind.as_bytes(), &n.to_le_bytes()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_id() {
        let default_id = ObjectId::default();
        assert_eq!(*default_id, [0u8; 32]);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let id = ObjectId::derive(&[b"seed_1", b"seed_2"]);
        assert_eq!(id, ObjectId::derive(&[b"seed_1", b"seed_2"]));

        // Seed order and boundaries matter
        assert_ne!(id, ObjectId::derive(&[b"seed_2", b"seed_1"]));
        assert_ne!(
            ObjectId::derive(&[b"ab", b"c"]),
            ObjectId::derive(&[b"a", b"bc"])
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let id = ObjectId::from_label("mare-42");
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(ObjectId::from_hex(&hex).unwrap(), id);
        assert!(ObjectId::from_hex("abcd").is_err());
        assert!(ObjectId::from_hex("not hex").is_err());
    }

    #[test]
    fn test_display_is_short() {
        let id = ObjectId::new([0xab; 32]);
        assert_eq!(id.to_string(), "obj:abababababab");
    }

    #[test]
    fn test_sequential_generator() {
        let generator = SequentialIdGenerator::new(b"test");
        let a = generator.next_id("offer");
        let b = generator.next_id("offer");
        assert_ne!(a, b);

        // Same seed replays the same sequence
        let replay = SequentialIdGenerator::new(b"test");
        assert_eq!(replay.next_id("offer"), a);

        // Kind participates in the derivation
        let other = SequentialIdGenerator::new(b"test");
        assert_ne!(other.next_id("transaction"), a);
    }

    #[test]
    fn test_time_seeded_generators_do_not_replay() {
        let first = SequentialIdGenerator::from_system_time();
        let restarted = SequentialIdGenerator::from_system_time();
        assert_ne!(first.next_id("offer"), restarted.next_id("offer"));
        assert_ne!(first.seed, restarted.seed);
    }
}
