pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
mod finite;
pub mod mine;

pub use chain::Chain;
pub use config::ChainConfig;
pub use error::{LedgerError, ValidationError};

use constants::{GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH, HASH_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::AtomicBool;
use std::time::{SystemTime, UNIX_EPOCH};

pub type Hash = [u8; HASH_SIZE];

pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}

/// Milliseconds since the Unix epoch; a clock set before 1970 reads as 0.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A batch of transactions sealed by its digest and linked to its predecessor.
///
/// Fields are public so callers can inspect blocks; writing to any of them after
/// sealing breaks `hash == calculate_hash()`, which [`Chain::verify`] reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix epoch milliseconds, captured once at construction.
    pub timestamp: u64,
    pub transactions: Value,
    #[serde(with = "hex_hash")]
    pub previous_hash: Hash,
    pub nonce: u64,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
}

impl Block {
    /// Build an unmined block stamped with the current time.
    ///
    /// Fails when `transactions` has no faithful JSON representation: maps
    /// keyed by non-strings, or NaN and infinite floats.
    pub fn new<T>(index: u64, transactions: &T, previous_hash: Hash) -> Result<Self, LedgerError>
    where
        T: Serialize + ?Sized,
    {
        finite::reject_non_finite(transactions)?;
        let transactions = serde_json::to_value(transactions)?;
        Ok(Self::from_payload(index, transactions, previous_hash))
    }

    pub fn from_payload(index: u64, transactions: Value, previous_hash: Hash) -> Self {
        Self::with_timestamp(index, now_millis(), transactions, previous_hash)
    }

    pub fn with_timestamp(
        index: u64,
        timestamp: u64,
        transactions: Value,
        previous_hash: Hash,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: [0u8; HASH_SIZE],
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Index 0, fixed payload, zeroed previous hash. Never mined.
    pub fn genesis() -> Self {
        Self::from_payload(0, Value::from(GENESIS_PAYLOAD), GENESIS_PREVIOUS_HASH)
    }

    /// Canonical JSON over the five hashed fields, keys sorted.
    pub fn canonical_form(&self) -> String {
        self.canonical_form_with_nonce(self.nonce)
    }

    fn canonical_form_with_nonce(&self, nonce: u64) -> String {
        // Keys kept alphabetical so the text is the same with or without
        // serde_json's `preserve_order`.
        json!({
            "index": self.index,
            "nonce": nonce,
            "previous_hash": hex::encode(self.previous_hash),
            "timestamp": self.timestamp,
            "transactions": self.transactions,
        })
        .to_string()
    }

    /// Digest of the block's current field values. Not cached.
    pub fn calculate_hash(&self) -> Hash {
        self.hash_with_nonce(self.nonce)
    }

    /// Digest the block would have if its nonce were `nonce`.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        sha256(self.canonical_form_with_nonce(nonce).as_bytes())
    }

    pub fn mine(&mut self, difficulty: u32) {
        pow::mine_block(self, difficulty)
    }

    /// Like [`Block::mine`] but gives up once `cancel` is set.
    pub fn mine_until(&mut self, difficulty: u32, cancel: &AtomicBool) -> Result<(), LedgerError> {
        pow::mine_block_until(self, difficulty, cancel)
    }

    /// Whether the stored hash has at least `difficulty` leading zero hex characters.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn previous_hash_hex(&self) -> String {
        hex::encode(self.previous_hash)
    }
}

mod hex_hash {
    use super::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut out = Hash::default();
        hex::decode_to_slice(&text, &mut out).map_err(D::Error::custom)?;
        Ok(out)
    }
}

pub mod pow {
    use super::{Block, Hash, LedgerError};
    use crate::constants::MAX_DIFFICULTY;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tracing::{debug, info, warn};

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 8;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }

    /// Leading `'0'` characters of the hash's lowercase hex rendering.
    pub fn count_leading_zero_nibbles(hash: &Hash) -> u32 {
        count_leading_zero_bits(hash) / 4
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        count_leading_zero_nibbles(hash) >= difficulty
    }

    /// Increment the nonce until the block hash has at least `difficulty`
    /// leading zero hex characters. Blocks the calling thread until then.
    pub fn mine_block(block: &mut Block, difficulty: u32) {
        let cancelled = search(block, difficulty, None);
        debug_assert!(cancelled.is_none());
    }

    /// Cancellable form of [`mine_block`]; `cancel` is polled before every attempt.
    ///
    /// A cancelled block keeps a consistent `nonce`/`hash` pair that simply
    /// does not meet the difficulty.
    pub fn mine_block_until(
        block: &mut Block,
        difficulty: u32,
        cancel: &AtomicBool,
    ) -> Result<(), LedgerError> {
        match search(block, difficulty, Some(cancel)) {
            None => Ok(()),
            Some(attempts) => {
                info!(index = block.index, attempts, "mining cancelled");
                Err(LedgerError::MiningCancelled {
                    index: block.index,
                    attempts,
                })
            }
        }
    }

    /// Shared nonce loop. Returns the attempt count if `cancel` stopped it.
    fn search(block: &mut Block, difficulty: u32, cancel: Option<&AtomicBool>) -> Option<u64> {
        if difficulty > MAX_DIFFICULTY {
            warn!(
                difficulty,
                max = MAX_DIFFICULTY,
                "difficulty exceeds digest width, mining cannot finish"
            );
        }
        debug!(index = block.index, difficulty, "mining block");

        let mut attempts = 0u64;
        while !meets_difficulty(&block.hash, difficulty) {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Some(attempts);
            }
            block.nonce = block.nonce.wrapping_add(1);
            block.hash = block.calculate_hash();
            attempts += 1;
        }

        info!(
            "Mined block {} with nonce {} and hash {}",
            block.index,
            block.nonce,
            block.hash_hex()
        );
        None
    }
}
