pub mod bits;
pub mod bucket;
pub mod bytes;
pub mod consts;
pub mod directory;
pub mod errors;
pub mod hasher;
pub mod keys;
pub mod report;
pub mod setup;

pub use bucket::Bucket;
pub use directory::Directory;
pub use errors::{IndexError, Result};
pub use hasher::{AnyHasher, Fnv1a, KeyHasher, XxHash32};
