use crate::{constants::MAX_DIFFICULTY, pow::meets_difficulty, Block, LedgerError};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Seals `block` by searching nonces in parallel, starting from its current nonce.
///
/// Uses `find_first`, so the winning nonce is the lowest qualifying one and
/// the result is identical to what [`crate::pow::mine_block`] produces.
/// Setting `cancel` stops every worker; the block is then left untouched
/// unless a qualifying nonce had already been found.
pub fn mine_block_parallel(
    block: &mut Block,
    difficulty: u32,
    cancel: Option<&AtomicBool>,
) -> Result<(), LedgerError> {
    if meets_difficulty(&block.hash, difficulty) {
        return Ok(());
    }
    if difficulty > MAX_DIFFICULTY {
        warn!(
            difficulty,
            max = MAX_DIFFICULTY,
            "difficulty exceeds digest width, mining cannot finish"
        );
    }
    debug!(index = block.index, difficulty, "mining block in parallel");

    let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));
    let attempts = AtomicU64::new(0);
    // Lowest qualifying nonce any worker has seen; u64::MAX is outside the range.
    let winner = AtomicU64::new(u64::MAX);
    let template: &Block = block;

    // The closure also accepts once cancelled so every worker unwinds quickly.
    // A nonce accepted that way is only kept if it really qualifies.
    let first = (template.nonce.saturating_add(1)..u64::MAX)
        .into_par_iter()
        .find_first(|nonce| {
            if cancelled() {
                return true;
            }
            attempts.fetch_add(1, Ordering::Relaxed);
            let qualifies = meets_difficulty(&template.hash_with_nonce(*nonce), difficulty);
            if qualifies {
                winner.fetch_min(*nonce, Ordering::Relaxed);
            }
            qualifies
        })
        .filter(|nonce| meets_difficulty(&template.hash_with_nonce(*nonce), difficulty));
    let winner = winner.into_inner();
    let found = first
        .into_iter()
        .chain((winner != u64::MAX).then_some(winner))
        .min();
    let attempts = attempts.into_inner();

    match found {
        Some(nonce) => {
            block.nonce = nonce;
            block.hash = block.calculate_hash();
            info!(
                "Mined block {} with nonce {} and hash {}",
                block.index,
                nonce,
                block.hash_hex()
            );
            Ok(())
        }
        None => {
            info!(index = block.index, attempts, "parallel mining cancelled");
            Err(LedgerError::MiningCancelled {
                index: block.index,
                attempts,
            })
        }
    }
}
