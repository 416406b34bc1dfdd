use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::debug;

use crate::consts::*;
use crate::directory::Directory;
use crate::errors::*;
use crate::hasher::*;
use crate::keys::KeyFile;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasherKind {
    #[value(name = "fnv1a")]
    Fnv1a,
    #[value(name = "xxh32")]
    Xxh32,
}

/// Builds an extendible hashing index over the keys of a file and reports
/// how many probes finding each of them takes.
#[derive(Parser, Debug, Clone)]
#[command(name = "ext_hash_index")]
pub struct Config {
    /// File with one key per line
    pub key_file: PathBuf,

    /// Number of keys to hash, at least 1
    pub key_count: usize,

    /// Bucket size in bytes, large enough to hold the longest key plus one
    pub bucket_size: usize,

    #[arg(long, value_enum, default_value_t = HasherKind::Fnv1a)]
    pub hasher: HasherKind,

    /// Seed for xxh32
    #[arg(long, default_value_t = 0)]
    pub seed: u32,

    /// Directory depth after which full buckets are chained
    #[arg(long, default_value_t = MAX_DEPTH, value_parser = clap::value_parser!(u8).range(0..=MAX_DEPTH as i64))]
    pub max_depth: u8,

    /// Log every insertion and the directory after it
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Only print the probe totals, not one line per key
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

impl Config {
    pub fn new(key_file: impl Into<PathBuf>, key_count: usize, bucket_size: usize) -> Self {
        Self {
            key_file: key_file.into(),
            key_count,
            bucket_size,
            hasher: HasherKind::Fnv1a,
            seed: 0,
            max_depth: MAX_DEPTH,
            debug: false,
            quiet: false,
        }
    }

    /// Checks what can be checked before the key file is read
    pub fn validate(&self) -> Result<()> {
        if self.key_count < 1 {
            return Err(IndexError::InvalidKeyCount(self.key_count));
        }
        Ok(())
    }

    /// Checks that every key fits a header cell and a bucket
    pub fn validate_keys(&self, key_file: &KeyFile) -> Result<()> {
        if let Some(key) = key_file.keys.iter().find(|key| key.len() > MAX_KEY_LEN) {
            return Err(IndexError::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        if self.bucket_size < key_file.longest + HEADER_CELL_SIZE {
            return Err(IndexError::BucketTooSmall {
                bucket_size: self.bucket_size,
                longest: key_file.longest,
            });
        }
        Ok(())
    }

    pub fn key_hasher(&self) -> AnyHasher {
        match self.hasher {
            HasherKind::Fnv1a => AnyHasher::Fnv1a(Fnv1a),
            HasherKind::Xxh32 => AnyHasher::XxHash32(XxHash32 { seed: self.seed }),
        }
    }
}

/// An empty index configured by `config`
pub fn setup_index(config: &Config) -> Directory<AnyHasher> {
    Directory::with_hasher(config.bucket_size, config.key_hasher()).with_max_depth(config.max_depth)
}

/// Validates `key_file` against `config` and inserts every key in file order.
pub fn build_index(config: &Config, key_file: &KeyFile) -> Result<Directory<AnyHasher>> {
    config.validate_keys(key_file)?;
    let mut directory = setup_index(config);
    for key in &key_file.keys {
        directory.insert(key)?;
        if config.debug {
            let hash = directory.hasher().hash(key.as_bytes());
            debug!("Hashed {} to:\t{:032b}", key, hash);
            debug!("Directory inserting {}:\n{}", key, directory);
        }
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_file(keys: &[&str]) -> KeyFile {
        KeyFile {
            keys: keys.iter().map(|key| key.to_string()).collect(),
            longest: keys.iter().map(|key| key.len()).max().unwrap_or(0),
        }
    }

    #[test]
    fn parses_positional_arguments() {
        let config = Config::try_parse_from(["ext_hash_index", "keys.txt", "10", "32"]).unwrap();
        assert_eq!(config.key_file, PathBuf::from("keys.txt"));
        assert_eq!(config.key_count, 10);
        assert_eq!(config.bucket_size, 32);
        assert_eq!(config.hasher, HasherKind::Fnv1a);
        assert_eq!(config.max_depth, MAX_DEPTH);
        assert!(!config.debug);
    }

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "ext_hash_index",
            "keys.txt",
            "1",
            "8",
            "--hasher",
            "xxh32",
            "--seed",
            "9",
            "--max-depth",
            "4",
            "--quiet",
        ])
        .unwrap();
        assert_eq!(config.hasher, HasherKind::Xxh32);
        assert_eq!(config.max_depth, 4);
        assert!(config.quiet);
        assert!(matches!(
            config.key_hasher(),
            AnyHasher::XxHash32(XxHash32 { seed: 9 })
        ));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Config::try_parse_from(["ext_hash_index", "keys.txt", "ten", "8"]).is_err());
        assert!(Config::try_parse_from(["ext_hash_index", "keys.txt", "1"]).is_err());
        assert!(
            Config::try_parse_from(["ext_hash_index", "k", "1", "8", "--max-depth", "31"]).is_err()
        );
        let config = Config::new("keys.txt", 0, 8);
        assert!(matches!(config.validate(), Err(IndexError::InvalidKeyCount(0))));
    }

    #[test]
    fn bucket_must_hold_longest_key() {
        let keys = key_file(&["Sun", "Java"]);
        assert!(Config::new("k", 2, 5).validate_keys(&keys).is_ok());
        assert!(matches!(
            Config::new("k", 2, 4).validate_keys(&keys),
            Err(IndexError::BucketTooSmall {
                bucket_size: 4,
                longest: 4
            })
        ));
    }

    #[test]
    fn keys_must_fit_a_header_cell() {
        let long = "x".repeat(MAX_KEY_LEN + 1);
        let keys = key_file(&[long.as_str()]);
        assert!(matches!(
            Config::new("k", 1, 1024).validate_keys(&keys),
            Err(IndexError::KeyTooLong { len: 256, .. })
        ));
    }

    #[test]
    fn builds_index_with_every_key() {
        let keys = key_file(&["Sun", "Java", "C", "Rust", "Go"]);
        let mut config = Config::new("k", 5, 5);
        config.debug = true;
        let directory = build_index(&config, &keys).unwrap();
        directory.check_invariants().unwrap();
        for key in &keys.keys {
            assert!(directory.search(key));
        }
    }
}
