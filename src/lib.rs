//! Sharded in-process LRU/TTL cache with single-flight loading.
//!
//! The cache is split into independent shards, each guarded by its own
//! mutex. A shard keeps its entries in a fixed arena backing an intrusive
//! doubly-linked recency list, indexed by a Robin-Hood open-addressed
//! table. Nothing is allocated on the hot path: slots are overwritten in
//! place once the cache is full.

#[path = "shared/singleflight/mod.rs"]
pub mod singleflight;
#[path = "shared/time/mod.rs"]
pub mod time;

pub mod cache;
pub mod storage;

pub use cache::{loader_fn, LoadError, Loader, LruCache, Options, Stats, TtlCache};
pub use singleflight::Group;
