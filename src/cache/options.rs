// Construction options shared by both cache variants.

use std::hash::{BuildHasher, Hash};

use xxhash_rust::xxh3::Xxh3Builder;

use super::loader::Loader;
use super::lru::LruCache;
use super::ttl::TtlCache;

/// Architecture cap on the shard count.
pub(crate) const MAX_SHARDS: usize = 512;

/// Builder-style options for [`LruCache`] and [`TtlCache`].
///
/// ```
/// use shardlru::{Options, TtlCache};
///
/// let cache: TtlCache<String, u64> = Options::new(10_000).shards(64).build_ttl();
/// ```
pub struct Options<K, V, S = Xxh3Builder> {
    pub(crate) capacity: usize,
    pub(crate) shards: Option<usize>,
    pub(crate) hasher: S,
    pub(crate) sliding: bool,
    pub(crate) loader: Option<Loader<K, V>>,
}

impl<K, V> Options<K, V, Xxh3Builder> {
    /// Starts options for a cache holding up to `capacity` entries,
    /// hashed with a randomly seeded xxh3.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shards: None,
            hasher: Xxh3Builder::new().with_seed(rand::random()),
            sliding: false,
            loader: None,
        }
    }

    /// Reseeds the default hasher. Useful for reproducible tests.
    pub fn seed(mut self, seed: u64) -> Self {
        self.hasher = Xxh3Builder::new().with_seed(seed);
        self
    }
}

impl<K, V, S> Options<K, V, S> {
    /// Overrides the shard count. Rounded up to a power of two; counts
    /// beyond the architecture cap fail loudly at build time.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Replaces the hash function.
    pub fn hasher<S2: BuildHasher>(self, hasher: S2) -> Options<K, V, S2> {
        Options {
            capacity: self.capacity,
            shards: self.shards,
            hasher,
            sliding: self.sliding,
            loader: self.loader,
        }
    }

    /// Enables sliding TTLs: a successful read resets the expiry to
    /// `now + original_ttl`.
    pub fn sliding(mut self, sliding: bool) -> Self {
        self.sliding = sliding;
        self
    }

    /// Installs the default loader used by `get_or_load`.
    pub fn loader(mut self, loader: Loader<K, V>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Resolves the shard count and per-shard capacity.
    pub(crate) fn layout(&self) -> (usize, u32) {
        assert!(self.capacity > 0, "cache capacity must be positive");
        let shards = match self.shards {
            Some(n) => {
                let n = n.max(1).next_power_of_two();
                assert!(
                    n <= MAX_SHARDS,
                    "shard count {n} exceeds the {MAX_SHARDS} cap"
                );
                n
            }
            None => (16 * num_cpus::get()).next_power_of_two().min(MAX_SHARDS),
        };
        let per_shard = self.capacity.div_ceil(shards).max(1) as u32;
        (shards, per_shard)
    }
}

impl<K, V, S> Options<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Builds the LRU-only variant.
    pub fn build_lru(self) -> LruCache<K, V, S> {
        LruCache::from_options(self)
    }

    /// Builds the TTL variant.
    pub fn build_ttl(self) -> TtlCache<K, V, S> {
        TtlCache::from_options(self)
    }
}
