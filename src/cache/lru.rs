// Package cache provides the LRU-only cache facade.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use xxhash_rust::xxh3::Xxh3Builder;

use crate::singleflight::Group;
use crate::storage::LruShard;

use super::hash32;
use super::loader::{LoadError, Loader};
use super::options::Options;
use super::stats::Stats;

/// Sharded cache with least-recently-used eviction and no expiry.
///
/// Same engine as [`super::TtlCache`](crate::TtlCache) with the plain
/// node layout: entries stay until evicted or deleted. Recency is
/// tracked per shard, so the LRU order is shard-local.
pub struct LruCache<K, V, S = Xxh3Builder> {
    shards: Box<[LruShard<K, V>]>,
    mask: u32,
    capacity: usize,
    hasher: S,
    loader: Option<Loader<K, V>>,
    group: Group<K, Result<V, LoadError>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a cache with default options: xxh3 hashing with a random
    /// seed, `next_pow2(16 × CPUs)` shards, no loader.
    pub fn new(capacity: usize) -> Self {
        Options::new(capacity).build_lru()
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    pub(crate) fn from_options(opts: Options<K, V, S>) -> Self {
        let (shard_count, per_shard) = opts.layout();
        let mut shards = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shards.push(LruShard::new(per_shard));
        }
        debug!(
            capacity = opts.capacity,
            shards = shard_count,
            per_shard,
            "lru cache created"
        );
        Self {
            shards: shards.into_boxed_slice(),
            mask: (shard_count - 1) as u32,
            capacity: opts.capacity,
            hasher: opts.hasher,
            loader: opts.loader,
            group: Group::new(),
        }
    }

    fn shard(&self, hash: u32) -> &LruShard<K, V> {
        &self.shards[(hash & self.mask) as usize]
    }

    /// Looks up a key, promoting it to most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let hash = hash32(&self.hasher, key);
        self.shard(hash).get(hash, key)
    }

    /// Reads a key without touching recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        let hash = hash32(&self.hasher, key);
        self.shard(hash).peek(hash, key)
    }

    /// Inserts or overwrites a key. Returns the previous value on
    /// overwrite or the evicted one on insertion, plus a flag telling
    /// whether the key was already present.
    pub fn set(&self, key: K, value: V) -> (Option<V>, bool) {
        let hash = hash32(&self.hasher, &key);
        self.shard(hash)
            .set(hash, key, value, |k| hash32(&self.hasher, k))
    }

    /// Like `set`, but an existing entry is left untouched and returned.
    pub fn set_if_absent(&self, key: K, value: V) -> (Option<V>, bool) {
        let hash = hash32(&self.hasher, &key);
        self.shard(hash)
            .set_if_absent(hash, key, value, |k| hash32(&self.hasher, k))
    }

    /// Removes a key and returns its previous value.
    pub fn delete(&self, key: &K) -> Option<V> {
        let hash = hash32(&self.hasher, key);
        self.shard(hash).delete(hash, key)
    }

    /// Number of indexed entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every key to `dst`, visiting shards in index order. The
    /// overall order is unspecified.
    pub fn append_keys(&self, dst: &mut Vec<K>) {
        for shard in self.shards.iter() {
            shard.append_keys(dst);
        }
    }

    /// Collects the keys into a fresh vector.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::new();
        self.append_keys(&mut keys);
        keys
    }

    /// Aggregates the per-shard counters, locking one shard at a time.
    pub fn stats(&self) -> Stats {
        let mut out = Stats::default();
        for shard in self.shards.iter() {
            let (counters, entries) = shard.stats();
            out.entries += entries;
            out.get_calls += counters.get_calls;
            out.set_calls += counters.set_calls;
            out.misses += counters.misses;
        }
        out
    }

    /// Looks the key up and, on a miss, produces it with the passed (or
    /// configured) loader, coalescing concurrent loads of the same key.
    /// Loader-returned TTLs are ignored by this variant. The flag is
    /// false only when the value came straight from the cache.
    pub async fn get_or_load(
        &self,
        ctx: CancellationToken,
        key: K,
        loader: Option<Loader<K, V>>,
    ) -> Result<(V, bool), LoadError> {
        if let Some(value) = self.get(&key) {
            return Ok((value, false));
        }
        let loader = loader
            .or_else(|| self.loader.clone())
            .ok_or(LoadError::LoaderIsNil)?;
        let (result, _shared) = self
            .group
            .work(key.clone(), || {
                let loader = loader.clone();
                let ctx = ctx.clone();
                let key = key.clone();
                async move {
                    match loader(ctx, key.clone()).await {
                        Ok((value, _ttl)) => {
                            self.set(key, value.clone());
                            Ok(value)
                        }
                        Err(err) => Err(LoadError::Loader(Arc::new(err))),
                    }
                }
            })
            .await;
        result.map(|value| (value, true))
    }
}

impl<K, V, S> fmt::Debug for LruCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}
