use crate::constants::{GENESIS_DATA, GENESIS_PREVIOUS_HASH};
use crate::{pow::meets_difficulty, Block, ChainError, MiningBudget, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Ordered, append-only sequence of mined blocks. Never empty: the genesis
/// block is mined on construction and deserialization rejects an empty list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChain")]
pub struct Chain {
    difficulty: u32,
    #[serde(rename = "chain")]
    blocks: Vec<Block>,
}

#[derive(Deserialize)]
struct RawChain {
    difficulty: u32,
    chain: Vec<Block>,
}

impl TryFrom<RawChain> for Chain {
    type Error = ChainError;

    fn try_from(raw: RawChain) -> Result<Self, Self::Error> {
        if raw.chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        Ok(Self {
            difficulty: raw.difficulty,
            blocks: raw.chain,
        })
    }
}

fn genesis_block() -> Block {
    Block::new(0, GENESIS_DATA, GENESIS_PREVIOUS_HASH)
}

impl Chain {
    /// Creates a chain and mines its genesis block at `difficulty`.
    pub fn new(difficulty: u32) -> Self {
        let mut genesis = genesis_block();
        genesis.mine(difficulty);
        Self {
            difficulty,
            blocks: vec![genesis],
        }
    }

    /// Like [`Chain::new`] with the genesis search bounded by `budget`.
    pub fn with_budget(difficulty: u32, budget: &MiningBudget) -> Result<Self, ChainError> {
        let mut genesis = genesis_block();
        genesis.mine_with(difficulty, budget)?;
        Ok(Self {
            difficulty,
            blocks: vec![genesis],
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ChainError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// Changes the difficulty used by later appends. Blocks already in the
    /// chain keep their hashes; [`Chain::verify`] checks them against the
    /// new value.
    pub fn set_difficulty(&mut self, difficulty: u32) {
        info!(from = self.difficulty, to = difficulty, "difficulty changed");
        self.difficulty = difficulty;
    }

    pub fn latest(&self) -> &Block {
        // Both constructors and deserialization guarantee at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Mines a block carrying `data` on top of the tip and appends it.
    /// Blocks the calling thread for ~16^difficulty hash attempts.
    pub fn append(&mut self, data: impl Into<String>) -> &Block {
        let mut block = self.next_block(data.into());
        block.mine(self.difficulty);
        self.push(block)
    }

    /// Bounded [`Chain::append`]. Nothing is appended when the budget runs out.
    pub fn append_with(
        &mut self,
        data: impl Into<String>,
        budget: &MiningBudget,
    ) -> Result<&Block, ChainError> {
        let mut block = self.next_block(data.into());
        block.mine_with(self.difficulty, budget)?;
        Ok(self.push(block))
    }

    fn next_block(&self, data: String) -> Block {
        let index = self.blocks.len() as u64;
        debug!(index, difficulty = self.difficulty, "mining block");
        Block::new(index, data, self.latest().hash())
    }

    fn push(&mut self, block: Block) -> &Block {
        info!(index = block.index(), nonce = block.nonce(), "block appended");
        self.blocks.push(block);
        self.latest()
    }

    /// Discards every block and mines a fresh genesis at the current difficulty.
    pub fn reset(&mut self) {
        info!(difficulty = self.difficulty, "resetting chain");
        *self = Self::new(self.difficulty);
    }

    /// Simulates an attack: replaces a block's payload without recomputing
    /// its hash. Not part of normal operation; [`Chain::validate`] detects it.
    pub fn force_set_data_without_rehash(
        &mut self,
        index: u64,
        data: impl Into<String>,
    ) -> Result<(), ChainError> {
        let len = self.blocks.len();
        let block = usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get_mut(i))
            .ok_or(ChainError::IndexOutOfRange { index, len })?;
        warn!(index, "overwriting block data without rehash");
        block.force_set_data_without_rehash(data.into());
        Ok(())
    }

    pub fn validate(&self) -> bool {
        self.verify().is_ok()
    }

    /// Walks the chain and returns the first integrity violation.
    ///
    /// Genesis must carry the `"0"` sentinel and an up-to-date hash; its
    /// proof-of-work is not rechecked, so a chain whose difficulty was raised
    /// reports the first later block mined below the new value. Every later
    /// block is checked for hash integrity, then the link to its
    /// predecessor, then proof-of-work against the current difficulty.
    pub fn verify(&self) -> Result<(), ValidationError> {
        let res = self.verify_blocks();
        if let Err(err) = &res {
            warn!(index = err.index(), %err, "chain validation failed");
        }
        res
    }

    fn verify_blocks(&self) -> Result<(), ValidationError> {
        let genesis = &self.blocks[0];
        if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
            return Err(ValidationError::GenesisSentinel { index: 0 });
        }
        if genesis.hash() != genesis.compute_hash() {
            return Err(ValidationError::HashMismatch { index: 0 });
        }

        for (i, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = i as u64 + 1;
            if current.hash() != current.compute_hash() {
                return Err(ValidationError::HashMismatch { index });
            }
            if current.previous_hash() != previous.hash() {
                return Err(ValidationError::LinkMismatch { index });
            }
            if !meets_difficulty(current.hash(), self.difficulty) {
                return Err(ValidationError::DifficultyNotMet {
                    index,
                    difficulty: self.difficulty,
                });
            }
        }
        Ok(())
    }
}
