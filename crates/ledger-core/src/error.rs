use crate::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The transaction payload has no canonical JSON form (e.g. a map keyed by non-strings).
    #[error("transaction payload cannot be serialized canonically: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("mining of block {index} cancelled after {attempts} attempts")]
    MiningCancelled { index: u64, attempts: u64 },
}

/// First integrity failure found while walking a chain.
///
/// `position` is the block's offset in the chain, not its `index` field, since
/// the field itself may be what was tampered with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "block {position}: stored hash {} does not match recomputed {}",
        hex::encode(.stored),
        hex::encode(.computed)
    )]
    HashMismatch {
        position: usize,
        stored: Hash,
        computed: Hash,
    },

    #[error(
        "block {position}: previous_hash {} does not link to predecessor hash {}",
        hex::encode(.found),
        hex::encode(.expected)
    )]
    BrokenLink {
        position: usize,
        expected: Hash,
        found: Hash,
    },
}

impl ValidationError {
    pub fn position(&self) -> usize {
        match self {
            ValidationError::HashMismatch { position, .. }
            | ValidationError::BrokenLink { position, .. } => *position,
        }
    }
}
