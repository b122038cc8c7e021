pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Payload of the block every chain starts with.
pub const GENESIS_DATA: &str = "Genesis Block";
/// `previous_hash` sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

pub const DEFAULT_DIFFICULTY: u32 = 2;
/// Upper bound accepted from user input. Expected work is ~16^difficulty hashes.
pub const MAX_PRACTICAL_DIFFICULTY: u32 = 6;

/// Number of nonce attempts between checks of a mining budget.
pub const CANCEL_POLL_INTERVAL: u64 = 1024;
