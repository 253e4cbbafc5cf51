// Aggregated cache counters.

/// Point-in-time cache statistics, summed over all shards.
/// Counters only grow; `entries` reflects the moment each shard was
/// visited and can lag concurrent writers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub entries: u64,
    pub get_calls: u64,
    pub set_calls: u64,
    pub misses: u64,
}
