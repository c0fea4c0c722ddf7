//! Routing variable ids to owning partitions.
//!
//! Every id hashes to exactly one partition:
//! `partition = hash64(id_bytes, hash_seed) % partition_count`
//!
//! The function is pure and stable during normal operation; every node
//! sharing a variable space must use the same seed and partition count.

use crate::store::id::VarId;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Routing table mapping ids to partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingTable {
    /// Number of partitions.
    partitions: u32,
    /// Hash seed for routing stability.
    hash_seed: u64,
}

impl RoutingTable {
    /// Create a routing table. `partitions` must be non-zero; the
    /// coordinator validates this through its configuration.
    pub fn new(partitions: u32, hash_seed: u64) -> Self {
        Self {
            partitions: partitions.max(1),
            hash_seed,
        }
    }

    /// Number of partitions.
    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Route a variable id to its owning partition.
    pub fn route(&self, id: &VarId) -> u32 {
        self.route_bytes(&[id.as_bytes()])
    }

    /// Route arbitrary key material, used for thread placement where the
    /// routing key is the `(module, function, args)` tuple.
    pub fn route_bytes(&self, parts: &[&[u8]]) -> u32 {
        let mut hasher = XxHash64::with_seed(self.hash_seed);
        for part in parts {
            hasher.write(part);
        }
        (hasher.finish() % u64::from(self.partitions)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_stable() {
        let table = RoutingTable::new(8, 7);
        let id = VarId::fresh();
        assert_eq!(table.route(&id), table.route(&id));
    }

    #[test]
    fn routing_stays_in_range() {
        let table = RoutingTable::new(3, 0);
        for _ in 0..64 {
            assert!(table.route(&VarId::fresh()) < 3);
        }
    }

    #[test]
    fn seed_changes_remap() {
        // Not guaranteed per-id, but over many ids the maps must differ.
        let a = RoutingTable::new(16, 1);
        let b = RoutingTable::new(16, 2);
        let ids: Vec<VarId> = (0..128).map(|_| VarId::fresh()).collect();
        assert!(ids.iter().any(|id| a.route(id) != b.route(id)));
    }
}
