/// Deepest the directory may grow. A depth of 31 would overflow the slot
/// count of a 32-bit index.
pub const MAX_DEPTH: u8 = 30;

/// Every stored key costs one header byte holding its length.
pub const HEADER_CELL_SIZE: usize = 1;

/// Longest key a header cell can describe.
pub const MAX_KEY_LEN: usize = u8::MAX as usize;

/// Width of the hash values used for addressing.
pub const HASH_BITS: u8 = 32;

/// Placeholder printed for the bit pattern of a depth 0 bucket.
pub const NO_PATTERN: &str = "_";
