//! Table-to-store routing.
//!
//! Many logical tables are multiplexed into a fixed pool of physical stores.
//! A table is assigned to exactly one store for its whole lifetime by a
//! stable hash of its name; collisions are expected and harmless because the
//! key codec partitions tables by identity within a shared store.

use siphasher::sip::SipHasher13;
use std::hash::Hasher;

// Fixed seeds so routing is deterministic across processes and runs.
const ROUTE_SEED_A: u64 = 0x9e37_79b9_7f4a_7c15;
const ROUTE_SEED_B: u64 = 0x6a09_e667_f3bc_c908;

/// Returns the index of the physical store hosting `table_name`.
pub(crate) fn route(table_name: &str, store_count: usize) -> usize {
    debug_assert!(store_count > 0);
    let mut hasher = SipHasher13::new_with_keys(ROUTE_SEED_A, ROUTE_SEED_B);
    hasher.write(table_name.as_bytes());
    (hasher.finish() % store_count as u64) as usize
}

/// Formats the name of the physical store at `index`.
pub(crate) fn store_name(index: usize) -> String {
    format!("shard_{index:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_route_is_stable() {
        for count in [1, 4, 64, 1024] {
            let first = route("candles_1m", count);
            for _ in 0..10 {
                assert_eq!(route("candles_1m", count), first);
            }
            assert!(first < count);
        }
    }

    #[test]
    fn test_route_spreads_tables() {
        let stores: HashSet<usize> = (0..1000)
            .map(|i| route(&format!("table_{i}"), 64))
            .collect();
        // 1000 names over 64 stores should touch most of them.
        assert!(stores.len() > 32, "only {} stores used", stores.len());
    }

    #[test]
    fn test_store_name_format() {
        assert_eq!(store_name(0), "shard_000");
        assert_eq!(store_name(63), "shard_063");
        assert_eq!(store_name(1023), "shard_1023");
    }
}
