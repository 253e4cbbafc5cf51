// Package storage implements the per-shard cache engine: the fixed arena
// list, the Robin-Hood index table, and the two shard variants.

pub mod list;
pub mod lru_shard;
pub mod table;
pub mod ttl_shard;

#[cfg(test)]
mod list_test;
#[cfg(test)]
mod shard_test;
#[cfg(test)]
mod table_test;

pub(crate) use lru_shard::LruShard;
pub(crate) use ttl_shard::TtlShard;

/// Per-shard counters, maintained under the shard lock.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ShardStats {
    pub get_calls: u64,
    pub set_calls: u64,
    pub misses: u64,
}
