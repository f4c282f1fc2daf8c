use crate::constants::DEFAULT_DIFFICULTY;
use serde::{Deserialize, Serialize};

/// Settings fixed when a chain is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Required run of leading zero hex characters in every mined block's hash.
    pub difficulty: u32,
    /// Seal blocks with the rayon nonce search instead of the single-threaded loop.
    pub parallel: bool,
}

impl ChainConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            parallel: false,
        }
    }
}
