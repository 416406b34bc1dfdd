/// Extendible hashing directory
use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, error, trace};

use crate::bits::*;
use crate::bucket::Bucket;
use crate::bytes::ByteLength;
use crate::consts::*;
use crate::errors::*;
use crate::hasher::{Fnv1a, KeyHasher};

/// The directory of an extendible hashing index
///
/// Buckets live in an arena owned by the directory and slots refer to them by
/// position, so several slots can share one bucket and repointing a slot is a
/// plain integer write.
pub struct Directory<H = Fnv1a> {
    hasher: H,

    /// The global depth, the number of leading hash bits used to pick a slot
    global_depth: u8,

    /// Arena positions of the bucket behind each slot
    ///
    /// The vector always holds 2^global_depth entries, indexed by the leading
    /// hash bits. For example if the global depth is 3:
    /// 000 -> slot 0
    /// 001 -> slot 1
    /// 010 -> slot 2
    /// 011 -> slot 3
    /// 100 -> slot 4
    /// ... and so on
    bucket_addresses: Vec<u32>,

    /// Every bucket a slot can point at. Overflow buckets are owned by the
    /// bucket they are chained to instead.
    buckets: Vec<Bucket>,

    /// Number of buckets created so far, chained ones included. Hands out ids.
    bucket_count: u32,

    capacity: usize,

    /// Depth at which the directory stops doubling and starts chaining
    max_depth: u8,
}

impl Directory<Fnv1a> {
    /// Creates a directory of depth 0 with a single empty bucket of
    /// `capacity` bytes, hashing keys with FNV-1a.
    ///
    /// `capacity` must be at least the longest key to be inserted plus one.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, Fnv1a)
    }
}

impl<H: KeyHasher> Directory<H> {
    pub fn with_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            hasher,
            global_depth: 0,
            bucket_addresses: vec![0],
            buckets: vec![Bucket::new(0, capacity)],
            bucket_count: 1,
            capacity,
            max_depth: MAX_DEPTH,
        }
    }

    /// Lowers the depth at which the directory stops doubling, capped at
    /// [MAX_DEPTH].
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth.min(MAX_DEPTH);
        self
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn depth(&self) -> u8 {
        self.global_depth
    }

    /// Number of slots, always 2^depth
    pub fn len(&self) -> usize {
        self.bucket_addresses.len()
    }

    /// Whether no key has been inserted yet. The directory itself always has
    /// at least one slot.
    pub fn has_no_keys(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.chain_iter().all(Bucket::is_empty))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buckets created, chained ones included
    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// The distinct buckets slots point at, in creation order
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn bucket_at(&self, slot: usize) -> &Bucket {
        &self.buckets[self.bucket_addresses[slot] as usize]
    }

    /// The bucket `key` is addressed to at the current depth
    pub fn bucket_for(&self, key: &str) -> &Bucket {
        self.bucket_at(self.slot_of(self.hasher.hash(key.as_bytes())))
    }

    fn slot_of(&self, hash: u32) -> usize {
        leftmost_bits(hash, self.global_depth) as usize
    }

    fn next_bucket_id(&mut self) -> u32 {
        let id = self.bucket_count;
        self.bucket_count += 1;
        id
    }

    /// Inserts `key`, splitting buckets, doubling the directory or chaining
    /// overflow buckets until it fits.
    ///
    /// `key` must be at most 255 bytes and at most `capacity - 1` bytes,
    /// longer keys are never stored and grow overflow chains without end.
    pub fn insert(&mut self, key: &str) -> Result<()> {
        let bytes = key.as_bytes();
        debug_assert!(bytes.len() <= MAX_KEY_LEN);
        debug_assert!(bytes.byte_len() <= self.capacity);

        let hash = self.hasher.hash(bytes);
        let mut slot = self.slot_of(hash);
        trace!(key, slot, bucket = self.bucket_at(slot).id(), "inserting");

        loop {
            let addr = self.bucket_addresses[slot] as usize;
            if self.buckets[addr].insert(bytes) {
                return Ok(());
            }

            let local = self.buckets[addr].depth();
            match local.cmp(&self.global_depth) {
                Ordering::Less => self.split_bucket(addr),
                Ordering::Equal => self.double_directory(slot)?,
                Ordering::Greater => {
                    error!(local, global = self.global_depth, "bucket deeper than directory");
                    return Err(IndexError::DepthInvariant {
                        local,
                        global: self.global_depth,
                    });
                }
            }
            slot = self.slot_of(hash);
        }
    }

    /// Splits a bucket shallower than the directory and hands the slots
    /// matching the sibling's pattern over to the sibling.
    fn split_bucket(&mut self, addr: usize) {
        let sibling_id = self.next_bucket_id();
        let sibling = self.buckets[addr].split(&self.hasher, sibling_id);
        let sibling_addr = self.buckets.len() as u32;

        // Slots sharing a bucket are contiguous, the sibling takes the upper half
        let shift = self.global_depth - sibling.depth();
        let start = (sibling.pattern_bits() as usize) << shift;
        let end = (sibling.pattern_bits() as usize + 1) << shift;
        self.bucket_addresses[start..end].fill(sibling_addr);

        debug!(
            bucket = self.buckets[addr].id(),
            sibling = sibling.id(),
            depth = sibling.depth(),
            "split bucket"
        );
        self.buckets.push(sibling);
    }

    /// Doubles the directory to make room for splitting the bucket behind
    /// `full_slot`.
    ///
    /// At the maximum depth the directory stays as it is and the full bucket
    /// gets an overflow bucket chained to it instead.
    pub fn double_directory(&mut self, full_slot: usize) -> Result<()> {
        let full_addr = self.bucket_addresses[full_slot];

        if self.global_depth >= self.max_depth {
            let id = self.next_bucket_id();
            let bucket = &mut self.buckets[full_addr as usize];
            debug!(bucket = bucket.id(), chained = id, "directory at max depth, chaining bucket");
            bucket.chain(id);
            return Ok(());
        }

        let len = self.bucket_addresses.len() * 2;
        let mut doubled: Vec<u32> = Vec::new();
        doubled
            .try_reserve_exact(len)
            .map_err(|_| IndexError::DirectoryAlloc {
                len: self.bucket_addresses.len(),
                depth: self.global_depth,
            })?;

        let sibling_id = self.next_bucket_id();
        let sibling = self.buckets[full_addr as usize].split(&self.hasher, sibling_id);
        let sibling_addr = self.buckets.len() as u32;
        self.buckets.push(sibling);

        for (slot, &address) in self.bucket_addresses.iter().enumerate() {
            doubled.push(address);
            doubled.push(if slot == full_slot { sibling_addr } else { address });
        }

        self.bucket_addresses = doubled;
        self.global_depth += 1;
        debug!(depth = self.global_depth, len, "doubled directory");
        Ok(())
    }

    /// Whether `key` is stored
    pub fn search(&self, key: &str) -> bool {
        self.bucket_for(key).search(key.as_bytes()).is_some()
    }

    /// Number of probes needed to find `key`, `None` if it was never inserted.
    pub fn count_probes(&self, key: &str) -> Option<u32> {
        self.bucket_for(key).count_probes(key.as_bytes())
    }

    /// Verifies slot addressing, and for every bucket byte conservation,
    /// header order and that its keys share its bit pattern.
    pub fn check_invariants(&self) -> Result<()> {
        let global = self.global_depth;
        if self.bucket_addresses.len() != 1 << global {
            return Err(IndexError::Inconsistent(format!(
                "{} slots at depth {}",
                self.bucket_addresses.len(),
                global
            )));
        }

        for slot in 0..self.bucket_addresses.len() {
            let bucket = self.bucket_at(slot);
            if bucket.depth() > global {
                return Err(IndexError::DepthInvariant {
                    local: bucket.depth(),
                    global,
                });
            }
            if (slot >> (global - bucket.depth())) as u32 != bucket.pattern_bits() {
                return Err(IndexError::Inconsistent(format!(
                    "slot {:b} points at bucket {} with pattern {}",
                    slot,
                    bucket.id(),
                    format_pattern(bucket.bit_pattern(), bucket.depth())
                )));
            }
        }

        for bucket in self.buckets.iter().flat_map(Bucket::chain_iter) {
            let used: usize = bucket.header().iter().map(|&len| len as usize + HEADER_CELL_SIZE).sum();
            if used + bucket.remaining_size() != bucket.capacity() {
                return Err(IndexError::Inconsistent(format!(
                    "bucket {} uses {} bytes with {} free of {}",
                    bucket.id(),
                    used,
                    bucket.remaining_size(),
                    bucket.capacity()
                )));
            }

            let keys: Vec<&[u8]> = bucket.keys().collect();
            if keys.windows(2).any(|pair| (pair[0].len(), pair[0]) > (pair[1].len(), pair[1])) {
                return Err(IndexError::Inconsistent(format!(
                    "bucket {} header out of order",
                    bucket.id()
                )));
            }
            if let Some(key) = keys
                .iter()
                .find(|key| leftmost_bits(self.hasher.hash(key), bucket.depth()) != bucket.pattern_bits())
            {
                return Err(IndexError::Inconsistent(format!(
                    "bucket {} holds {:?} outside its pattern",
                    bucket.id(),
                    String::from_utf8_lossy(key)
                )));
            }
        }
        Ok(())
    }
}

impl<H: KeyHasher> fmt::Display for Directory<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directory Depth: {}", self.global_depth)?;
        let width = (self.global_depth as usize).max(1);
        for slot in 0..self.bucket_addresses.len() {
            writeln!(f, "{:0width$b}{}", slot, self.bucket_at(slot), width = width)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Fnv1a;

    /// Reads a key of '0' and '1' characters as the leading bits of its hash
    struct BinaryHasher;

    impl KeyHasher for BinaryHasher {
        fn hash(&self, bytes: &[u8]) -> u32 {
            bytes
                .iter()
                .take(32)
                .enumerate()
                .fold(0, |hash, (i, bit)| hash | (((*bit == b'1') as u32) << (31 - i)))
        }
    }

    /// Sends every key to the same place so no split can separate them
    struct ConstHasher;

    impl KeyHasher for ConstHasher {
        fn hash(&self, _bytes: &[u8]) -> u32 {
            0
        }
    }

    #[test]
    fn starts_with_one_empty_bucket() {
        let dir = Directory::new(16);
        assert_eq!(dir.depth(), 0);
        assert_eq!(dir.len(), 1);
        assert!(dir.has_no_keys());
        assert_eq!(dir.max_depth(), MAX_DEPTH);
        assert_eq!(dir.count_probes("missing"), None);
        dir.check_invariants().unwrap();
    }

    #[test]
    fn overflow_doubles_into_complementary_buckets() {
        let mut dir = Directory::with_hasher(2, BinaryHasher);
        dir.insert("0").unwrap();
        assert_eq!(dir.depth(), 0);
        dir.insert("1").unwrap();

        assert_eq!(dir.depth(), 1);
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.buckets().len(), 2);
        assert_eq!(dir.bucket_at(0).bit_pattern(), Some(0));
        assert_eq!(dir.bucket_at(1).bit_pattern(), Some(1));
        assert_eq!(dir.bucket_for("0").id(), dir.bucket_at(0).id());
        assert_eq!(dir.bucket_for("1").id(), dir.bucket_at(1).id());
        assert_eq!(dir.count_probes("0"), Some(1));
        assert_eq!(dir.count_probes("1"), Some(1));
        dir.check_invariants().unwrap();
    }

    #[test]
    fn fnv_keys_with_different_top_bits_split_once() {
        // "Sun" hashes to 0x42d8d701 and "Zig" to 0xfd0cf091
        assert_eq!(leftmost_bits(Fnv1a.hash(b"Sun"), 1), 0);
        assert_eq!(leftmost_bits(Fnv1a.hash(b"Zig"), 1), 1);

        let mut dir = Directory::new(4);
        dir.insert("Sun").unwrap();
        assert!(!dir.has_no_keys());
        assert_eq!(dir.depth(), 0);
        dir.insert("Zig").unwrap();

        assert_eq!(dir.depth(), 1);
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.bucket_count(), 2);
        let (low, high) = (dir.bucket_at(0), dir.bucket_at(1));
        assert_eq!((low.depth(), low.bit_pattern()), (1, Some(0)));
        assert_eq!((high.depth(), high.bit_pattern()), (1, Some(1)));
        assert_eq!(low.search(b"Sun"), Some(0));
        assert_eq!(high.search(b"Zig"), Some(0));
        assert_eq!(dir.bucket_for("Sun").id(), low.id());
        assert_eq!(dir.bucket_for("Zig").id(), high.id());
        assert_eq!(dir.count_probes("Sun"), Some(1));
        assert_eq!(dir.count_probes("Zig"), Some(1));
        dir.check_invariants().unwrap();
    }

    #[test]
    fn shallow_bucket_splits_without_doubling() {
        let mut dir = Directory::with_hasher(3, BinaryHasher);
        dir.insert("00").unwrap();
        dir.insert("10").unwrap();
        assert_eq!(dir.depth(), 1);

        dir.insert("01").unwrap();
        assert_eq!(dir.depth(), 2);
        // slots 10 and 11 still share the depth 1 bucket
        assert_eq!(dir.bucket_at(2).id(), dir.bucket_at(3).id());
        assert_eq!(dir.bucket_at(2).depth(), 1);

        dir.insert("11").unwrap();
        assert_eq!(dir.depth(), 2);
        assert_eq!(dir.buckets().len(), 4);
        for (slot, key) in ["00", "01", "10", "11"].iter().enumerate() {
            let bucket = dir.bucket_at(slot);
            assert_eq!(bucket.depth(), 2);
            assert_eq!(bucket.pattern_bits(), slot as u32);
            assert_eq!(bucket.search(key.as_bytes()), Some(0));
        }
        dir.check_invariants().unwrap();
    }

    #[test]
    fn chains_once_max_depth_is_reached() {
        let mut dir = Directory::with_hasher(2, ConstHasher).with_max_depth(3);
        for key in ["a", "b", "c", "d"] {
            dir.insert(key).unwrap();
        }

        assert_eq!(dir.depth(), 3);
        assert_eq!(dir.len(), 8);
        let bucket = dir.bucket_at(0);
        assert_eq!(bucket.chain_len(), 3);
        assert_eq!(dir.count_probes("a"), Some(1));
        assert_eq!(dir.count_probes("b"), Some(3));
        assert_eq!(dir.count_probes("d"), Some(7));
        assert_eq!(dir.count_probes("e"), None);
        // three splits and three chained buckets
        assert_eq!(dir.bucket_count(), 7);
        dir.check_invariants().unwrap();
    }

    #[test]
    fn max_depth_is_capped() {
        let dir = Directory::new(8).with_max_depth(40);
        assert_eq!(dir.max_depth(), MAX_DEPTH);
    }

    #[test]
    fn every_key_found_after_many_splits() {
        let keys: Vec<String> = (0..500).map(|i| format!("key-{i}")).collect();
        let mut dir = Directory::new(24);
        for key in &keys {
            dir.insert(key).unwrap();
        }
        dir.check_invariants().unwrap();
        assert!(dir.depth() > 0);
        for key in &keys {
            assert!(dir.search(key), "{key} not found");
            let probes = dir.count_probes(key).expect("probe count");
            assert!(probes >= 1);
            assert_eq!(Some(probes), dir.count_probes(key));
        }
        assert!(!dir.search("key-500"));
    }

    #[test]
    fn dump_lists_every_slot() {
        let mut dir = Directory::with_hasher(2, BinaryHasher);
        dir.insert("0").unwrap();
        dir.insert("1").unwrap();
        let dump = dir.to_string();
        let mut lines = dump.lines();
        assert_eq!(lines.next(), Some("Directory Depth: 1"));
        assert_eq!(lines.next(), Some("0|B: 0 D: 1 Bit: 0|[1]...0 free bytes...0"));
        assert_eq!(lines.next(), Some("1|B: 1 D: 1 Bit: 1|[1]...0 free bytes...1"));
    }

    #[test]
    fn fnv_round_trip_holds_invariants_after_each_insert() {
        let mut dir = Directory::with_hasher(10, Fnv1a);
        for word in ["Sun", "Java", "C", "Rust", "Go", "Zig", "Ada", "Lisp", "ML", "Forth"] {
            dir.insert(word).unwrap();
            dir.check_invariants().unwrap();
        }
        assert!(dir.search("Forth"));
        assert!(dir.search("Sun"));
    }
}
