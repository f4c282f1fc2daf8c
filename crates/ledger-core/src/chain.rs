use crate::{mine::mine_block_parallel, pow, Block, ChainConfig, LedgerError, ValidationError};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use tracing::{debug, warn};

/// In-memory, append-only sequence of blocks starting at an unmined genesis.
///
/// Not internally synchronised: callers sharing a chain across threads must
/// keep `append*` and `verify`/`is_valid` from running at the same time.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    config: ChainConfig,
}

impl Chain {
    pub fn new(difficulty: u32) -> Self {
        Self::with_config(ChainConfig::with_difficulty(difficulty))
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Raw mutable access that skips sealing. Any edit made through it is
    /// reported by [`Chain::verify`]; there is no supported way to amend a block.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Block> {
        self.blocks.get(position)
    }

    pub fn tip(&self) -> &Block {
        // Genesis is pushed at construction and nothing removes blocks.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Mine a block holding `transactions` on top of the tip and append it.
    ///
    /// Blocks until the proof-of-work is found. Appending to a chain that
    /// already fails validation is allowed.
    pub fn append<T>(&mut self, transactions: &T) -> Result<&Block, LedgerError>
    where
        T: Serialize + ?Sized,
    {
        let mut block = self.next_block(transactions)?;
        if self.config.parallel {
            mine_block_parallel(&mut block, self.config.difficulty, None)?;
        } else {
            pow::mine_block(&mut block, self.config.difficulty);
        }
        Ok(self.push(block))
    }

    /// [`Chain::append`] that gives up once `cancel` is set. Nothing is
    /// appended on cancellation.
    pub fn append_until<T>(
        &mut self,
        transactions: &T,
        cancel: &AtomicBool,
    ) -> Result<&Block, LedgerError>
    where
        T: Serialize + ?Sized,
    {
        let mut block = self.next_block(transactions)?;
        if self.config.parallel {
            mine_block_parallel(&mut block, self.config.difficulty, Some(cancel))?;
        } else {
            pow::mine_block_until(&mut block, self.config.difficulty, cancel)?;
        }
        Ok(self.push(block))
    }

    fn next_block<T>(&self, transactions: &T) -> Result<Block, LedgerError>
    where
        T: Serialize + ?Sized,
    {
        Block::new(self.blocks.len() as u64, transactions, self.tip().hash)
    }

    fn push(&mut self, block: Block) -> &Block {
        debug!(index = block.index, height = self.blocks.len(), "appending block");
        self.blocks.push(block);
        self.tip()
    }

    /// Walk every non-genesis block in order, recomputing its digest and
    /// checking it links to its predecessor. Stops at the first failure.
    pub fn verify(&self) -> Result<(), ValidationError> {
        for (offset, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let position = offset + 1;

            let computed = current.calculate_hash();
            if computed != current.hash {
                return Err(ValidationError::HashMismatch {
                    position,
                    stored: current.hash,
                    computed,
                });
            }

            if current.previous_hash != previous.hash {
                return Err(ValidationError::BrokenLink {
                    position,
                    expected: previous.hash,
                    found: current.previous_hash,
                });
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "chain failed validation");
                false
            }
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::with_config(ChainConfig::default())
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
