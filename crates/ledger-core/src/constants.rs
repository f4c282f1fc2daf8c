pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading zero hex characters required of a sealed block unless configured otherwise.
pub const DEFAULT_DIFFICULTY: u32 = 2;
/// Beyond this no digest can qualify and mining never ends.
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const GENESIS_PAYLOAD: &str = "Genesis Block";
pub const GENESIS_PREVIOUS_HASH: [u8; HASH_SIZE] = [0u8; HASH_SIZE];
