// Package cache provides the user-facing facades over the sharded engine.

pub mod loader;
pub mod lru;
pub mod options;
pub mod stats;
pub mod ttl;


pub use loader::{loader_fn, LoadError, Loader, LoaderResult};
pub use lru::LruCache;
pub use options::Options;
pub use stats::Stats;
pub use ttl::TtlCache;

use std::hash::{BuildHasher, Hash};

/// Folds the 64-bit std hash into the 32-bit shard hash: the low bits
/// select the shard, the high bits feed the table fragment.
pub(crate) fn hash32<S: BuildHasher, K: Hash + ?Sized>(hasher: &S, key: &K) -> u32 {
    let h = hasher.hash_one(key);
    (h ^ (h >> 32)) as u32
}
