use thiserror::Error;

/// Why a bounded mining search stopped before finding a qualifying hash.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineError {
    #[error("mining cancelled at nonce {nonce}")]
    Cancelled { nonce: u64 },
    #[error("mining deadline exceeded at nonce {nonce}")]
    DeadlineExceeded { nonce: u64 },
}

/// First integrity violation found while walking a chain.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("genesis block at index {index} does not carry the \"0\" previous-hash sentinel")]
    GenesisSentinel { index: u64 },
    #[error("stored hash does not match block contents at index {index}")]
    HashMismatch { index: u64 },
    #[error("previous hash does not match predecessor at index {index}")]
    LinkMismatch { index: u64 },
    #[error("hash does not meet difficulty {difficulty} at index {index}")]
    DifficultyNotMet { index: u64, difficulty: u32 },
}

impl ValidationError {
    /// Index of the offending block.
    pub fn index(&self) -> u64 {
        match *self {
            ValidationError::GenesisSentinel { index }
            | ValidationError::HashMismatch { index }
            | ValidationError::LinkMismatch { index }
            | ValidationError::DifficultyNotMet { index, .. } => index,
        }
    }
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Mine(#[from] MineError),
    #[error("block index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: u64, len: usize },
    #[error("chain has no blocks")]
    EmptyChain,
    #[error("chain json: {0}")]
    Json(#[from] serde_json::Error),
}
