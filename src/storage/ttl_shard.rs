// Package storage provides the TTL shard: one lock-protected segment of
// the cache, with per-entry expiry and optional sliding refresh.

use parking_lot::Mutex;

use crate::time;

use super::list::{Expiry, List};
use super::table::Table;
use super::ShardStats;

/// One cache segment with TTL support. All state sits behind a single
/// mutex; every operation takes the precomputed 32-bit hash of its key.
pub(crate) struct TtlShard<K, V> {
    inner: Mutex<TtlInner<K, V>>,
}

struct TtlInner<K, V> {
    list: List<K, V, Expiry>,
    table: Table,
    sliding: bool,
    stats: ShardStats,
}

impl<K: Eq + Clone, V: Clone> TtlShard<K, V> {
    pub fn new(capacity: u32, sliding: bool) -> Self {
        Self {
            inner: Mutex::new(TtlInner {
                list: List::new(capacity),
                table: Table::new(capacity),
                sliding,
                stats: ShardStats::default(),
            }),
        }
    }

    /// Looks up a live entry and promotes it to MRU. An expired entry is
    /// retired on the spot: dropped from the table, parked at the LRU
    /// tail, and reported as a miss.
    pub fn get(&self, hash: u32, key: &K) -> Option<V> {
        let inner = &mut *self.inner.lock();
        inner.stats.get_calls += 1;
        let TtlInner {
            list,
            table,
            sliding,
            stats,
        } = inner;

        let Some(idx) = table.get(hash, |i| list.node(i).key.as_ref() == Some(key)) else {
            stats.misses += 1;
            return None;
        };

        let now = time::now();
        let expires = list.node(idx).meta.expires;
        if expires != 0 && now >= expires {
            table.delete(hash, |i| list.node(i).key.as_ref() == Some(key));
            list.move_to_back(idx);
            let node = list.node_mut(idx);
            node.key = None;
            node.value = None;
            node.meta = Expiry::default();
            stats.misses += 1;
            return None;
        }

        if *sliding {
            let node = list.node_mut(idx);
            if node.meta.ttl != 0 {
                node.meta.expires = now + node.meta.ttl;
            }
        }
        list.move_to_front(idx);
        list.node(idx).value.clone()
    }

    /// Reads an entry without reordering or expiry enforcement.
    /// Returns the value and the raw expiry seconds (0 = no expiry).
    pub fn peek(&self, hash: u32, key: &K) -> Option<(V, u32)> {
        let inner = self.inner.lock();
        let idx = inner
            .table
            .get(hash, |i| inner.list.node(i).key.as_ref() == Some(key))?;
        let node = inner.list.node(idx);
        node.value.clone().map(|v| (v, node.meta.expires))
    }

    /// Inserts or overwrites an entry. On hit the value is replaced in
    /// place and the entry promoted; the expiry schedule is only touched
    /// when `ttl_secs > 0`. On miss the LRU tail slot is overwritten.
    /// Returns `(previous_or_evicted, replaced)`.
    pub fn set(
        &self,
        hash: u32,
        key: K,
        value: V,
        ttl_secs: u32,
        rehash: impl Fn(&K) -> u32,
    ) -> (Option<V>, bool) {
        let inner = &mut *self.inner.lock();
        inner.stats.set_calls += 1;
        let TtlInner { list, table, .. } = inner;

        if let Some(idx) = table.get(hash, |i| list.node(i).key.as_ref() == Some(&key)) {
            let now = time::now();
            let node = list.node_mut(idx);
            let prev = node.value.replace(value);
            if ttl_secs != 0 {
                node.meta = Expiry {
                    expires: now + ttl_secs,
                    ttl: ttl_secs,
                };
            }
            list.move_to_front(idx);
            return (prev, true);
        }

        let meta = if ttl_secs != 0 {
            Expiry {
                expires: time::now() + ttl_secs,
                ttl: ttl_secs,
            }
        } else {
            Expiry::default()
        };
        let evicted = insert_tail(list, table, hash, key, value, meta, rehash);
        (evicted, false)
    }

    /// Inserts only when the key is absent. An expired hit counts as
    /// absent and is replaced in place.
    pub fn set_if_absent(
        &self,
        hash: u32,
        key: K,
        value: V,
        ttl_secs: u32,
        rehash: impl Fn(&K) -> u32,
    ) -> (Option<V>, bool) {
        let inner = &mut *self.inner.lock();
        inner.stats.set_calls += 1;
        let TtlInner { list, table, .. } = inner;
        let now = time::now();

        if let Some(idx) = table.get(hash, |i| list.node(i).key.as_ref() == Some(&key)) {
            let node = list.node_mut(idx);
            let expires = node.meta.expires;
            if expires == 0 || now < expires {
                return (node.value.clone(), false);
            }
            node.value = Some(value);
            node.meta = if ttl_secs != 0 {
                Expiry {
                    expires: now + ttl_secs,
                    ttl: ttl_secs,
                }
            } else {
                Expiry::default()
            };
            list.move_to_front(idx);
            return (None, true);
        }

        let meta = if ttl_secs != 0 {
            Expiry {
                expires: now + ttl_secs,
                ttl: ttl_secs,
            }
        } else {
            Expiry::default()
        };
        let evicted = insert_tail(list, table, hash, key, value, meta, rehash);
        (evicted, false)
    }

    /// Removes an entry: drops it from the table, clears the slot, and
    /// parks it at the LRU tail for reuse. Returns the old value.
    pub fn delete(&self, hash: u32, key: &K) -> Option<V> {
        let inner = &mut *self.inner.lock();
        let TtlInner { list, table, .. } = inner;
        let idx = table.delete(hash, |i| list.node(i).key.as_ref() == Some(key))?;
        list.move_to_back(idx);
        let node = list.node_mut(idx);
        node.key = None;
        node.meta = Expiry::default();
        node.value.take()
    }

    pub fn len(&self) -> u32 {
        self.inner.lock().table.len()
    }

    /// Appends every unexpired key to `dst`, in no particular order.
    pub fn append_keys(&self, dst: &mut Vec<K>) {
        let inner = self.inner.lock();
        let now = time::now();
        for idx in inner.table.indexes() {
            let node = inner.list.node(idx);
            if node.meta.expires != 0 && now >= node.meta.expires {
                continue;
            }
            if let Some(key) = node.key.clone() {
                dst.push(key);
            }
        }
    }

    /// Returns the counters and current entry count, read together under
    /// the shard lock.
    pub fn stats(&self) -> (ShardStats, u64) {
        let inner = self.inner.lock();
        (inner.stats, inner.table.len() as u64)
    }
}

/// Overwrites the LRU tail slot with a fresh entry. This is the eviction
/// point: the victim's key is dropped from the table first, guarded
/// against phantom deletes (the slot may be pristine, or its key may no
/// longer map to this slot).
fn insert_tail<K: Eq + Clone, V>(
    list: &mut List<K, V, Expiry>,
    table: &mut Table,
    hash: u32,
    key: K,
    value: V,
    meta: Expiry,
    rehash: impl Fn(&K) -> u32,
) -> Option<V> {
    let victim = list.tail();
    if let Some(old_key) = list.node(victim).key.clone() {
        let old_hash = rehash(&old_key);
        let mapped = table.get(old_hash, |i| list.node(i).key.as_ref() == Some(&old_key));
        if mapped == Some(victim) {
            table.delete(old_hash, |i| list.node(i).key.as_ref() == Some(&old_key));
        }
    }
    table.set(hash, victim, |i| list.node(i).key.as_ref() == Some(&key));
    let node = list.node_mut(victim);
    let evicted = node.value.take();
    node.key = Some(key);
    node.value = Some(value);
    node.meta = meta;
    list.move_to_front(victim);
    evicted
}
