//! Tests for the shard contract shared by both variants.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use xxhash_rust::xxh3::Xxh3Builder;

    use crate::cache::hash32;
    use crate::storage::lru_shard::LruShard;
    use crate::storage::ttl_shard::TtlShard;
    use crate::time;

    fn hasher() -> Xxh3Builder {
        Xxh3Builder::new().with_seed(42)
    }

    #[test]
    fn test_lru_eviction_order() {
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: LruShard<&str, u64> = LruShard::new(3);

        shard.set(h(&"a"), "a", 1, h);
        shard.set(h(&"b"), "b", 2, h);
        shard.set(h(&"c"), "c", 3, h);
        assert_eq!(shard.get(h(&"a"), &"a"), Some(1));

        // "b" is now the LRU tail and must make room for "d".
        shard.set(h(&"d"), "d", 4, h);
        assert_eq!(shard.get(h(&"b"), &"b"), None);
        assert_eq!(shard.get(h(&"a"), &"a"), Some(1));
        assert_eq!(shard.get(h(&"c"), &"c"), Some(3));
        assert_eq!(shard.get(h(&"d"), &"d"), Some(4));
        assert_eq!(shard.len(), 3);
    }

    #[test]
    fn test_lru_set_overwrites_in_place() {
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: LruShard<&str, u64> = LruShard::new(2);

        assert_eq!(shard.set(h(&"a"), "a", 1, h), (None, false));
        assert_eq!(shard.set(h(&"a"), "a", 2, h), (Some(1), true));
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get(h(&"a"), &"a"), Some(2));
    }

    #[test]
    fn test_lru_delete_is_idempotent() {
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: LruShard<&str, u64> = LruShard::new(2);

        shard.set(h(&"a"), "a", 1, h);
        assert_eq!(shard.delete(h(&"a"), &"a"), Some(1));
        assert_eq!(shard.delete(h(&"a"), &"a"), None);
        assert_eq!(shard.len(), 0);
    }

    #[test]
    fn test_lru_set_if_absent_keeps_existing() {
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: LruShard<&str, u64> = LruShard::new(2);

        assert_eq!(shard.set_if_absent(h(&"a"), "a", 1, h), (None, false));
        assert_eq!(shard.set_if_absent(h(&"a"), "a", 9, h), (Some(1), false));
        assert_eq!(shard.get(h(&"a"), &"a"), Some(1));
    }

    #[test]
    fn test_lru_reuses_deleted_slot_without_phantom_delete() {
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: LruShard<&str, u64> = LruShard::new(2);

        shard.set(h(&"a"), "a", 1, h);
        shard.set(h(&"b"), "b", 2, h);
        shard.delete(h(&"a"), &"a");

        // The cleared slot sits at the tail; taking it must not disturb
        // the index entries of live keys.
        shard.set(h(&"c"), "c", 3, h);
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.get(h(&"b"), &"b"), Some(2));
        assert_eq!(shard.get(h(&"c"), &"c"), Some(3));
    }

    #[test]
    fn test_lru_fills_pristine_slots_before_evicting() {
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: LruShard<&str, u64> = LruShard::new(4);

        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            let (evicted, replaced) = shard.set(h(k), *k, i as u64, h);
            assert_eq!(evicted, None, "no value may be evicted while filling");
            assert!(!replaced);
        }
        assert_eq!(shard.len(), 4);
    }

    #[test]
    fn test_ttl_get_retires_expired_entry() {
        time::init();
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: TtlShard<&str, u64> = TtlShard::new(4, false);

        shard.set(h(&"x"), "x", 1, 1, h);
        assert_eq!(shard.get(h(&"x"), &"x"), Some(1));
        std::thread::sleep(Duration::from_millis(2200));
        assert_eq!(shard.get(h(&"x"), &"x"), None);
        assert_eq!(shard.len(), 0, "expired get must clear the table entry");
    }

    #[test]
    fn test_ttl_set_if_absent_replaces_expired() {
        time::init();
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: TtlShard<&str, u64> = TtlShard::new(4, false);

        shard.set(h(&"x"), "x", 1, 1, h);
        std::thread::sleep(Duration::from_millis(2200));
        assert_eq!(shard.set_if_absent(h(&"x"), "x", 2, 1, h), (None, true));
        assert_eq!(shard.get(h(&"x"), &"x"), Some(2));
    }

    #[test]
    fn test_ttl_peek_ignores_order_and_expiry() {
        time::init();
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: TtlShard<&str, u64> = TtlShard::new(2, false);

        shard.set(h(&"a"), "a", 1, 0, h);
        shard.set(h(&"b"), "b", 2, 30, h);

        let (value, expires) = shard.peek(h(&"b"), &"b").unwrap();
        assert_eq!(value, 2);
        assert!(expires > time::now(), "expiry must be in the future");
        let (_, no_expiry) = shard.peek(h(&"a"), &"a").unwrap();
        assert_eq!(no_expiry, 0);

        // Peek must not promote: "a" is still the tail and gets evicted.
        shard.peek(h(&"a"), &"a");
        shard.set(h(&"c"), "c", 3, 0, h);
        assert_eq!(shard.get(h(&"a"), &"a"), None);
        assert_eq!(shard.get(h(&"b"), &"b"), Some(2));
    }

    #[test]
    fn test_ttl_append_keys_skips_expired() {
        time::init();
        let hasher = hasher();
        let h = |k: &&str| hash32(&hasher, k);
        let shard: TtlShard<&str, u64> = TtlShard::new(4, false);

        shard.set(h(&"stale"), "stale", 1, 1, h);
        shard.set(h(&"fresh"), "fresh", 2, 0, h);
        std::thread::sleep(Duration::from_millis(2200));

        let mut keys = Vec::new();
        shard.append_keys(&mut keys);
        assert_eq!(keys, vec!["fresh"]);
    }
}
