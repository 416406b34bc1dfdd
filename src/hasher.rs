/// Hash functions that map a key's bytes to the 32-bit value the directory
/// addresses buckets with.
///
/// Implementations must be deterministic and free of side effects, a bucket
/// re-hashes its stored keys whenever it splits.
pub trait KeyHasher {
    fn hash(&self, bytes: &[u8]) -> u32;
}

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1a;

impl KeyHasher for Fnv1a {
    fn hash(&self, bytes: &[u8]) -> u32 {
        bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ *byte as u32).wrapping_mul(FNV_PRIME)
        })
    }
}

/// 32-bit xxHash with a fixed seed
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHash32 {
    pub seed: u32,
}

impl KeyHasher for XxHash32 {
    fn hash(&self, bytes: &[u8]) -> u32 {
        twox_hash::XxHash32::oneshot(self.seed, bytes)
    }
}

/// Runtime choice of hasher, used by the binary.
#[derive(Debug, Clone, Copy)]
pub enum AnyHasher {
    Fnv1a(Fnv1a),
    XxHash32(XxHash32),
}

impl Default for AnyHasher {
    fn default() -> Self {
        AnyHasher::Fnv1a(Fnv1a)
    }
}

impl KeyHasher for AnyHasher {
    fn hash(&self, bytes: &[u8]) -> u32 {
        match self {
            AnyHasher::Fnv1a(h) => h.hash(bytes),
            AnyHasher::XxHash32(h) => h.hash(bytes),
        }
    }
}
