use std::cmp::Ordering;
use std::fmt;
use std::iter::successors;

use tracing::trace;

use crate::bits::*;
use crate::bytes::*;
use crate::consts::HEADER_CELL_SIZE;
use crate::hasher::KeyHasher;

/// A fixed capacity bucket of variable length keys
///
/// ## Binary layout
///
/// ```text
/// +--------------------------------------------+
/// |   HEADER ->   |   free   |   <- BUFFER     |
/// +--------------------------------------------+
/// ```
///
/// - The header grows left to right, one byte per key holding the key's length.
///   Lengths are kept in ascending order, keys of equal length are ordered
///   lexicographically.
/// - The buffer grows right to left. The key described by header cell `i`
///   starts `header[0] + ... + header[i]` bytes from the end of the array.
///   Keys are stored as is, not reversed.
///
/// Storing `Sun`, `Java` and `C` in a 12 byte bucket gives
/// `[1, 3, 4, _, J, a, v, a, S, u, n, C]`.
///
/// Keys must be at most 255 bytes and at most `capacity - 1` bytes, the bucket
/// does not check either.
pub struct Bucket {
    /// Allocation order of the bucket within its directory, only used for display
    id: u32,

    /// The local depth, the number of leading hash bits every key in here shares
    depth: u8,

    /// The shared leading hash bits, `None` until the first split
    bit_pattern: Option<u32>,

    data: Box<[u8]>,

    /// Free bytes between the end of the header and the start of the buffer
    remaining_size: usize,

    /// Number of keys in this bucket, also the length of the header
    num_entries: usize,

    /// Index of the first used buffer byte, `capacity` when empty
    start_of_buffer: usize,

    /// Overflow bucket, only linked once the directory can no longer grow
    next: Option<Box<Bucket>>,
}

impl Bucket {
    pub fn new(id: u32, capacity: usize) -> Self {
        Self {
            id,
            depth: 0,
            bit_pattern: None,
            data: vec![0; capacity].into_boxed_slice(),
            remaining_size: capacity,
            num_entries: 0,
            start_of_buffer: capacity,
            next: None,
        }
    }

    /// An empty bucket with the capacity, depth and bit pattern of `self`
    fn empty_like(&self, id: u32) -> Self {
        let mut bucket = Bucket::new(id, self.capacity());
        bucket.depth = self.depth;
        bucket.bit_pattern = self.bit_pattern;
        bucket
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn bit_pattern(&self) -> Option<u32> {
        self.bit_pattern
    }

    /// The bit pattern as an integer, 0 before the first split
    pub fn pattern_bits(&self) -> u32 {
        self.bit_pattern.unwrap_or(0)
    }

    pub fn remaining_size(&self) -> usize {
        self.remaining_size
    }

    /// Number of keys stored in this bucket, not counting the chain
    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    pub fn header(&self) -> &[u8] {
        &self.data[..self.num_entries]
    }

    /// Number of overflow buckets linked after this one
    pub fn chain_len(&self) -> usize {
        self.chain_iter().count() - 1
    }

    /// This bucket followed by its overflow chain
    pub fn chain_iter(&self) -> impl Iterator<Item = &Bucket> {
        successors(Some(self), |bucket| bucket.next.as_deref())
    }

    /// The keys of this bucket in header order
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let capacity = self.capacity();
        self.header().iter().scan(0_usize, move |dist, &len| {
            *dist += len as usize;
            let start = capacity - *dist;
            Some(&self.data[start..start + len as usize])
        })
    }

    /// The `len` bytes starting `dist` bytes from the end of the array
    fn word_at(&self, dist: usize, len: usize) -> &[u8] {
        let start = self.capacity() - dist;
        &self.data[start..start + len]
    }

    fn has_room_for(&self, key: &[u8]) -> bool {
        self.remaining_size >= key.byte_len()
    }

    fn increment_depth(&mut self, bit: bool) {
        self.depth += 1;
        self.bit_pattern = Some(match (self.bit_pattern, bit) {
            (None, false) => 0,
            (None, true) => 1,
            (Some(pattern), false) => append_bit0(pattern),
            (Some(pattern), true) => append_bit1(pattern),
        });
    }

    /// Inserts `key` into the first bucket of the chain with room for it.
    ///
    /// Returns false when neither this bucket nor any chained bucket has
    /// `key.len() + 1` free bytes.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let mut bucket = self;
        loop {
            if bucket.has_room_for(key) {
                bucket.insert_here(key);
                return true;
            }
            trace!(bucket = bucket.id, "bucket is full");
            match bucket.next.as_deref_mut() {
                Some(next) => bucket = next,
                None => return false,
            }
        }
    }

    fn insert_here(&mut self, key: &[u8]) {
        debug_assert!(key.len() <= u8::MAX as usize);
        let len = key.len();
        let capacity = self.capacity();

        // Find the header slot, summing the lengths of the keys before it
        let mut index = 0;
        let mut offset = 0;
        while index < self.num_entries {
            let stored = self.data[index] as usize;
            if stored > len || (stored == len && key < self.word_at(offset + len, len)) {
                break;
            }
            offset += stored;
            index += 1;
        }

        shift_right(&mut self.data, index, self.num_entries, 1);
        shift_left(&mut self.data, self.start_of_buffer, capacity - offset, len);

        self.data[index] = len as u8;
        let start = capacity - offset - len;
        self.data[start..start + len].copy_from_slice(key);

        self.start_of_buffer -= len;
        self.num_entries += 1;
        self.remaining_size -= key.byte_len();
    }

    /// Removes the key at header `index` which starts `dist` bytes from the end
    fn remove_at(&mut self, index: usize, dist: usize) {
        let len = self.data[index] as usize;
        let capacity = self.capacity();

        erase(&mut self.data, index, index + 1);
        shift_left(&mut self.data, index + 1, self.num_entries, 1);

        let start = capacity - dist;
        erase(&mut self.data, start, start + len);
        shift_right(&mut self.data, self.start_of_buffer, start, len);

        self.start_of_buffer += len;
        self.num_entries -= 1;
        self.remaining_size += len + HEADER_CELL_SIZE;
    }

    /// Looks for `key` in this bucket only.
    ///
    /// Returns the header index of the key if found and the number of key
    /// comparisons made.
    fn probe(&self, key: &[u8]) -> (Option<usize>, u32) {
        if key.len() > u8::MAX as usize {
            return (None, 0);
        }
        let len = key.len();
        let header = self.header();

        let Some(mid) = find_length(header, len as u8) else {
            return (None, 0);
        };
        let mid_dist: usize = header[..=mid].iter().map(|&l| l as usize).sum();

        let mut probes = 1;
        if self.word_at(mid_dist, len) == key {
            return (Some(mid), probes);
        }

        let mut dist = mid_dist;
        for index in (0..mid).rev() {
            if header[index] as usize != len {
                break;
            }
            dist -= len;
            probes += 1;
            if self.word_at(dist, len) == key {
                return (Some(index), probes);
            }
        }

        let mut dist = mid_dist;
        for index in mid + 1..header.len() {
            if header[index] as usize != len {
                break;
            }
            dist += len;
            probes += 1;
            if self.word_at(dist, len) == key {
                return (Some(index), probes);
            }
        }

        (None, probes)
    }

    /// Header index of `key` within whichever bucket of the chain holds it
    pub fn search(&self, key: &[u8]) -> Option<usize> {
        self.chain_iter().find_map(|bucket| bucket.probe(key).0)
    }

    /// Number of key comparisons needed to find `key`, plus one for every
    /// chained bucket stepped into. `None` if the key is not stored.
    pub fn count_probes(&self, key: &[u8]) -> Option<u32> {
        let mut total = 0;
        for (link, bucket) in self.chain_iter().enumerate() {
            if link > 0 {
                total += 1;
            }
            let (found, probes) = bucket.probe(key);
            total += probes;
            if found.is_some() {
                return Some(total);
            }
        }
        None
    }

    /// Splits the bucket on one more leading hash bit.
    ///
    /// Both buckets go one level deeper, `self` keeps the keys whose next bit
    /// is 0 and the returned sibling receives the keys whose next bit is 1.
    pub fn split<H: KeyHasher>(&mut self, hasher: &H, sibling_id: u32) -> Bucket {
        let mut sibling = self.empty_like(sibling_id);
        sibling.increment_depth(true);
        self.increment_depth(false);

        let pattern = self.pattern_bits();
        self.filter(&mut sibling, hasher, pattern);
        sibling
    }

    /// Moves every key whose leading `depth` hash bits differ from `pattern`
    /// into `other`, compacting this bucket in place.
    pub fn filter<H: KeyHasher>(&mut self, other: &mut Bucket, hasher: &H, pattern: u32) {
        let mut index = 0;
        let mut offset = 0;
        while index < self.num_entries {
            let len = self.data[index] as usize;
            let dist = offset + len;
            let word = self.word_at(dist, len);

            if leftmost_bits(hasher.hash(word), self.depth) != pattern {
                let moved = other.insert(word);
                debug_assert!(moved, "split sibling ran out of room");
                self.remove_at(index, dist);
            } else {
                offset = dist;
                index += 1;
            }
        }
    }

    /// Links an empty bucket with the same capacity, depth and bit pattern at
    /// the end of the overflow chain.
    pub fn chain(&mut self, id: u32) {
        let link = self.empty_like(id);
        let mut slot = &mut self.next;
        while let Some(bucket) = slot {
            slot = &mut bucket.next;
        }
        *slot = Some(Box::new(link));
    }

    fn fmt_single(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = self.header().iter().map(|len| len.to_string()).collect();
        write!(
            f,
            "|B: {} D: {} Bit: {}|[{}]...{} free bytes...{}",
            self.id,
            self.depth,
            format_pattern(self.bit_pattern, self.depth),
            header.join(","),
            self.remaining_size,
            String::from_utf8_lossy(&self.data[self.start_of_buffer..]),
        )
    }
}

/// Index of some header cell equal to `len`.
///
/// Bisects the header around the lower middle of the remaining range and
/// returns the first equal cell it meets. Probe counts depend on which cell
/// of an equal-length run this lands on, so it is fixed here rather than
/// left to `slice::binary_search`.
fn find_length(header: &[u8], len: u8) -> Option<usize> {
    let mut low = 0;
    let mut high = header.len();
    while low < high {
        let mid = low + (high - 1 - low) / 2;
        match len.cmp(&header[mid]) {
            Ordering::Less => high = mid,
            Ordering::Greater => low = mid + 1,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_single(f)?;
        for link in self.chain_iter().skip(1) {
            write!(f, " -> (next bucket: {})\n    -> ", link.id)?;
            link.fmt_single(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("bit_pattern", &self.bit_pattern)
            .field("header", &self.header())
            .field("remaining_size", &self.remaining_size)
            .field("chain_len", &self.chain_len())
            .finish()
    }
}
