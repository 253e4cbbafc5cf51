// Package cache provides the TTL cache facade.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use xxhash_rust::xxh3::Xxh3Builder;

use crate::singleflight::Group;
use crate::storage::TtlShard;
use crate::time;

use super::hash32;
use super::loader::{LoadError, Loader};
use super::options::Options;
use super::stats::Stats;

/// Sharded cache with least-recently-used eviction and per-entry TTLs.
///
/// Operations on disjoint shards proceed fully in parallel; recency is
/// tracked per shard, so the LRU order is shard-local. TTLs have whole-
/// second accuracy against a coarse background clock.
pub struct TtlCache<K, V, S = Xxh3Builder> {
    shards: Box<[TtlShard<K, V>]>,
    mask: u32,
    capacity: usize,
    hasher: S,
    loader: Option<Loader<K, V>>,
    group: Group<K, Result<V, LoadError>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a cache with default options: xxh3 hashing with a random
    /// seed, `next_pow2(16 × CPUs)` shards, sliding off, no loader.
    pub fn new(capacity: usize) -> Self {
        Options::new(capacity).build_ttl()
    }
}

impl<K, V, S> TtlCache<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    pub(crate) fn from_options(opts: Options<K, V, S>) -> Self {
        time::init();
        let (shard_count, per_shard) = opts.layout();
        let mut shards = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shards.push(TtlShard::new(per_shard, opts.sliding));
        }
        debug!(
            capacity = opts.capacity,
            shards = shard_count,
            per_shard,
            sliding = opts.sliding,
            "ttl cache created"
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

    fn shard(&self, hash: u32) -> &TtlShard<K, V> {
        &self.shards[(hash & self.mask) as usize]
    }

    /// Looks up a key, promoting it to most recently used. Expired
    /// entries are retired and reported as misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let hash = hash32(&self.hasher, key);
        self.shard(hash).get(hash, key)
    }

    /// Reads a key without touching recency or enforcing expiry. The
    /// second element is the absolute expiry, when one is set.
    pub fn peek(&self, key: &K) -> Option<(V, Option<SystemTime>)> {
        let hash = hash32(&self.hasher, key);
        self.shard(hash)
            .peek(hash, key)
            .map(|(v, expires)| (v, (expires != 0).then(|| time::to_system_time(expires))))
    }

    /// Inserts or overwrites a key. `ttl` is truncated to whole seconds;
    /// `Duration::ZERO` means the entry never expires. Returns the
    /// previous value on overwrite or the evicted one on insertion, plus
    /// a flag telling whether the key was already present.
    pub fn set(&self, key: K, value: V, ttl: Duration) -> (Option<V>, bool) {
        let hash = hash32(&self.hasher, &key);
        self.shard(hash)
            .set(hash, key, value, ttl_secs(ttl), |k| hash32(&self.hasher, k))
    }

    /// Like `set`, but an existing unexpired entry is left untouched and
    /// returned. An expired entry counts as absent.
    pub fn set_if_absent(&self, key: K, value: V, ttl: Duration) -> (Option<V>, bool) {
        let hash = hash32(&self.hasher, &key);
        self.shard(hash)
            .set_if_absent(hash, key, value, ttl_secs(ttl), |k| hash32(&self.hasher, k))
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

    /// Appends every unexpired key to `dst`, visiting shards in index
    /// order. The overall order is unspecified.
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
    /// The flag is false only when the value came straight from the
    /// cache. A loader failure is propagated and leaves the cache
    /// untouched.
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
                        Ok((value, ttl)) => {
                            self.set(key, value.clone(), ttl.unwrap_or(Duration::ZERO));
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

impl<K, V, S> fmt::Debug for TtlCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("capacity", &self.capacity)
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

fn ttl_secs(ttl: Duration) -> u32 {
    ttl.as_secs().min(u32::MAX as u64) as u32
}
