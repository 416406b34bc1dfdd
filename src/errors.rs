use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    /// A bucket ended up deeper than the directory addressing it. Only a bug in
    /// splitting or doubling can cause this and nothing can be repaired locally.
    #[error("local depth {local} exceeds global depth {global}")]
    DepthInvariant { local: u8, global: u8 },

    /// Doubling the directory failed to allocate. `len` and `depth` describe
    /// the directory as it still is.
    #[error("not enough memory to expand directory of length {len} (depth = {depth})")]
    DirectoryAlloc { len: usize, depth: u8 },

    #[error("key of {len} bytes is longer than the maximum of {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("bucket size {bucket_size} cannot hold the longest key ({longest} bytes) plus its length")]
    BucketTooSmall { bucket_size: usize, longest: usize },

    #[error("number of keys to hash must be at least 1, got {0}")]
    InvalidKeyCount(usize),

    #[error("no keys found in {0}")]
    EmptyKeyFile(PathBuf),

    #[error("inconsistent index: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
