use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;

pub use chain::Chain;
pub use error::{ChainError, MineError, ValidationError};
pub use mine::{CancelToken, MineStats, MiningBudget};

/// Seconds since the Unix epoch. A clock set before the epoch reads as 0.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Canonical block digest: SHA-256 over the fields rendered as text and
/// concatenated in this order without separators, as lowercase hex.
pub fn digest(index: u64, timestamp: u64, data: &str, previous_hash: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string());
    hasher.update(timestamp.to_string());
    hasher.update(data.as_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(nonce.to_string());
    hex::encode(hasher.finalize())
}

/// A single ledger entry. `hash` always matches the other five fields,
/// except while a search is running or after an explicit tamper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    data: String,
    previous_hash: String,
    hash: String,
    nonce: u64,
}

impl Block {
    pub fn new(index: u64, data: impl Into<String>, previous_hash: impl Into<String>) -> Self {
        Self::with_timestamp(index, unix_now(), data, previous_hash)
    }

    /// Like [`Block::new`] but with a caller-chosen timestamp, so fixtures hash reproducibly.
    pub fn with_timestamp(
        index: u64,
        timestamp: u64,
        data: impl Into<String>,
        previous_hash: impl Into<String>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            data: data.into(),
            previous_hash: previous_hash.into(),
            hash: String::new(),
            nonce: 0,
        };
        block.hash = block.compute_hash();
        block
    }

    /// [`digest`] of the block's current fields.
    pub fn compute_hash(&self) -> String {
        digest(
            self.index,
            self.timestamp,
            &self.data,
            &self.previous_hash,
            self.nonce,
        )
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Overwrites the payload and leaves the stored hash stale.
    pub(crate) fn force_set_data_without_rehash(&mut self, data: String) {
        self.data = data;
    }
}

pub mod pow {
    /// Number of leading `'0'` characters in a hex digest.
    pub fn leading_zero_hex(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    /// True when the first `difficulty` characters of `hash` are all `'0'`.
    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        leading_zero_hex(hash) >= difficulty as usize
    }
}
