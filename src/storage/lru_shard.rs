// Package storage provides the LRU-only shard: same engine as the TTL
// variant but with the plain node layout and no expiry checks.

use parking_lot::Mutex;

use super::list::List;
use super::table::Table;
use super::ShardStats;

/// One cache segment without expiry support. All state sits behind a
/// single mutex; every operation takes the precomputed 32-bit hash of
/// its key.
pub(crate) struct LruShard<K, V> {
    inner: Mutex<LruInner<K, V>>,
}

struct LruInner<K, V> {
    list: List<K, V, ()>,
    table: Table,
    stats: ShardStats,
}

impl<K: Eq + Clone, V: Clone> LruShard<K, V> {
    pub fn new(capacity: u32) -> Self {
        Self {
            inner: Mutex::new(LruInner {
                list: List::new(capacity),
                table: Table::new(capacity),
                stats: ShardStats::default(),
            }),
        }
    }

    /// Looks up an entry and promotes it to MRU.
    pub fn get(&self, hash: u32, key: &K) -> Option<V> {
        let inner = &mut *self.inner.lock();
        inner.stats.get_calls += 1;
        let LruInner {
            list,
            table,
            stats,
        } = inner;

        let Some(idx) = table.get(hash, |i| list.node(i).key.as_ref() == Some(key)) else {
            stats.misses += 1;
            return None;
        };
        list.move_to_front(idx);
        list.node(idx).value.clone()
    }

    /// Reads an entry without reordering.
    pub fn peek(&self, hash: u32, key: &K) -> Option<V> {
        let inner = self.inner.lock();
        let idx = inner
            .table
            .get(hash, |i| inner.list.node(i).key.as_ref() == Some(key))?;
        inner.list.node(idx).value.clone()
    }

    /// Inserts or overwrites an entry. On hit the value is replaced in
    /// place and the entry promoted; on miss the LRU tail slot is
    /// overwritten. Returns `(previous_or_evicted, replaced)`.
    pub fn set(&self, hash: u32, key: K, value: V, rehash: impl Fn(&K) -> u32) -> (Option<V>, bool) {
        let inner = &mut *self.inner.lock();
        inner.stats.set_calls += 1;
        let LruInner { list, table, .. } = inner;

        if let Some(idx) = table.get(hash, |i| list.node(i).key.as_ref() == Some(&key)) {
            let node = list.node_mut(idx);
            let prev = node.value.replace(value);
            list.move_to_front(idx);
            return (prev, true);
        }

        let evicted = insert_tail(list, table, hash, key, value, rehash);
        (evicted, false)
    }

    /// Inserts only when the key is absent; an existing entry is left
    /// untouched and returned.
    pub fn set_if_absent(
        &self,
        hash: u32,
        key: K,
        value: V,
        rehash: impl Fn(&K) -> u32,
    ) -> (Option<V>, bool) {
        let inner = &mut *self.inner.lock();
        inner.stats.set_calls += 1;
        let LruInner { list, table, .. } = inner;

        if let Some(idx) = table.get(hash, |i| list.node(i).key.as_ref() == Some(&key)) {
            return (list.node(idx).value.clone(), false);
        }

        let evicted = insert_tail(list, table, hash, key, value, rehash);
        (evicted, false)
    }

    /// Removes an entry: drops it from the table, clears the slot, and
    /// parks it at the LRU tail for reuse. Returns the old value.
    pub fn delete(&self, hash: u32, key: &K) -> Option<V> {
        let inner = &mut *self.inner.lock();
        let LruInner { list, table, .. } = inner;
        let idx = table.delete(hash, |i| list.node(i).key.as_ref() == Some(key))?;
        list.move_to_back(idx);
        let node = list.node_mut(idx);
        node.key = None;
        node.value.take()
    }

    pub fn len(&self) -> u32 {
        self.inner.lock().table.len()
    }

    /// Appends every key to `dst`, in no particular order.
    pub fn append_keys(&self, dst: &mut Vec<K>) {
        let inner = self.inner.lock();
        for idx in inner.table.indexes() {
            if let Some(key) = inner.list.node(idx).key.clone() {
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

/// Overwrites the LRU tail slot with a fresh entry, dropping the victim's
/// key from the table first. The table delete is guarded: the slot may be
/// pristine, or its key may no longer map to this slot.
fn insert_tail<K: Eq + Clone, V>(
    list: &mut List<K, V, ()>,
    table: &mut Table,
    hash: u32,
    key: K,
    value: V,
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
    list.move_to_front(victim);
    evicted
}
