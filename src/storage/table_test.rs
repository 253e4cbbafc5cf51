//! Tests for the Robin-Hood index table.

#[cfg(test)]
mod tests {
    use crate::storage::table::Table;

    /// Builds a 32-bit hash whose 24-bit fragment is `frag`.
    fn h(frag: u32) -> u32 {
        frag << 8
    }

    /// `keys[i]` plays the role of the arena node at index `i`.
    fn eq<'a>(keys: &'a [&'a str], want: &'a str) -> impl FnMut(u32) -> bool + 'a {
        move |i| keys[i as usize] == want
    }

    #[test]
    fn test_set_get_roundtrip() {
        let keys = ["", "alpha", "beta", "gamma", "", "", "", ""];
        let mut table = Table::new(4);

        assert_eq!(table.set(h(1), 1, eq(&keys, "alpha")), None);
        assert_eq!(table.set(h(2), 2, eq(&keys, "beta")), None);
        assert_eq!(table.set(h(3), 3, eq(&keys, "gamma")), None);
        assert_eq!(table.len(), 3);

        assert_eq!(table.get(h(1), eq(&keys, "alpha")), Some(1));
        assert_eq!(table.get(h(2), eq(&keys, "beta")), Some(2));
        assert_eq!(table.get(h(3), eq(&keys, "gamma")), Some(3));
        assert_eq!(table.get(h(4), eq(&keys, "delta")), None);
    }

    #[test]
    fn test_overwrite_returns_previous_index() {
        let keys = ["", "alpha", "alpha", "", "", "", "", ""];
        let mut table = Table::new(4);

        assert_eq!(table.set(h(1), 1, eq(&keys, "alpha")), None);
        // Re-pointing the same key at a new slot keeps the length.
        assert_eq!(table.set(h(1), 2, eq(&keys, "alpha")), Some(1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(h(1), eq(&keys, "alpha")), Some(2));
    }

    #[test]
    fn test_same_fragment_disambiguated_by_key() {
        let keys = ["", "alpha", "beta", "", "", "", "", ""];
        let mut table = Table::new(4);

        // Identical hashes: only full key equality tells them apart.
        assert_eq!(table.set(h(5), 1, eq(&keys, "alpha")), None);
        assert_eq!(table.set(h(5), 2, eq(&keys, "beta")), None);
        assert_eq!(table.len(), 2);

        assert_eq!(table.get(h(5), eq(&keys, "alpha")), Some(1));
        assert_eq!(table.get(h(5), eq(&keys, "beta")), Some(2));
        assert_eq!(table.get(h(5), eq(&keys, "other")), None);
    }

    #[test]
    fn test_delete_backward_shifts_chain() {
        let keys = ["", "alpha", "beta", "gamma", "", "", "", ""];
        let mut table = Table::new(4);

        table.set(h(3), 1, eq(&keys, "alpha"));
        table.set(h(3), 2, eq(&keys, "beta"));
        table.set(h(3), 3, eq(&keys, "gamma"));

        assert_eq!(table.delete(h(3), eq(&keys, "alpha")), Some(1));
        assert_eq!(table.len(), 2);

        // The survivors must still be reachable through the shifted chain.
        assert_eq!(table.get(h(3), eq(&keys, "beta")), Some(2));
        assert_eq!(table.get(h(3), eq(&keys, "gamma")), Some(3));
        assert_eq!(table.get(h(3), eq(&keys, "alpha")), None);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let keys = ["", "alpha", "", "", "", "", "", ""];
        let mut table = Table::new(4);

        assert_eq!(table.delete(h(1), eq(&keys, "alpha")), None);
        table.set(h(1), 1, eq(&keys, "alpha"));
        assert_eq!(table.delete(h(2), eq(&keys, "beta")), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_probe_wraps_around_the_table() {
        // Fragment 7 targets the last bucket of a size-8 table; the
        // collision chain must wrap to buckets 0 and 1.
        let keys = ["", "alpha", "beta", "gamma", "", "", "", ""];
        let mut table = Table::new(4);

        table.set(h(7), 1, eq(&keys, "alpha"));
        table.set(h(7), 2, eq(&keys, "beta"));
        table.set(h(7), 3, eq(&keys, "gamma"));

        assert_eq!(table.get(h(7), eq(&keys, "alpha")), Some(1));
        assert_eq!(table.get(h(7), eq(&keys, "beta")), Some(2));
        assert_eq!(table.get(h(7), eq(&keys, "gamma")), Some(3));

        assert_eq!(table.delete(h(7), eq(&keys, "beta")), Some(2));
        assert_eq!(table.get(h(7), eq(&keys, "gamma")), Some(3));
    }

    #[test]
    fn test_displacement_keeps_everything_reachable() {
        // "x" sits at its ideal bucket with DIB 1; the long chain rooted
        // at fragment 2 arrives poorer and must steal its slot.
        let keys = ["", "a0", "a1", "a2", "a3", "a4", "x", ""];
        let mut table = Table::new(6);

        table.set(h(6), 6, eq(&keys, "x"));
        table.set(h(2), 1, eq(&keys, "a0"));
        table.set(h(2), 2, eq(&keys, "a1"));
        table.set(h(2), 3, eq(&keys, "a2"));
        table.set(h(2), 4, eq(&keys, "a3"));
        table.set(h(2), 5, eq(&keys, "a4"));
        assert_eq!(table.len(), 6);

        assert_eq!(table.get(h(2), eq(&keys, "a0")), Some(1));
        assert_eq!(table.get(h(2), eq(&keys, "a1")), Some(2));
        assert_eq!(table.get(h(2), eq(&keys, "a2")), Some(3));
        assert_eq!(table.get(h(2), eq(&keys, "a3")), Some(4));
        assert_eq!(table.get(h(2), eq(&keys, "a4")), Some(5));
        assert_eq!(table.get(h(6), eq(&keys, "x")), Some(6));

        let mut indexes: Vec<u32> = table.indexes().collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![1, 2, 3, 4, 5, 6]);
    }
}
