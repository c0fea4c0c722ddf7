//! Built-in lattice types.
//!
//! Each type is a join-semilattice: join is commutative, associative, and
//! idempotent, so a cell's value converges regardless of bind order. The
//! implementations are total over `Datum`; inputs of an unexpected shape
//! are treated as the bottom of the type.

use super::registry::LatticeOps;
use crate::store::value::Datum;
use std::collections::{BTreeMap, BTreeSet};

/// Grow-only counter: a map from replica id to a non-decreasing count.
///
/// Join is the pointwise maximum; a missing replica entry counts as zero.
pub struct GCounter;

impl GCounter {
    fn entries(value: &Datum) -> BTreeMap<String, u64> {
        match value {
            Datum::Map(map) => map
                .iter()
                .filter_map(|(replica, count)| match count {
                    Datum::Uint(n) => Some((replica.clone(), *n)),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Build a counter state that increments one replica's count.
    pub fn increment(current: &Datum, replica: &str) -> Datum {
        let mut entries = Self::entries(current);
        *entries.entry(replica.to_string()).or_insert(0) += 1;
        Datum::Map(
            entries
                .into_iter()
                .map(|(replica, count)| (replica, Datum::Uint(count)))
                .collect(),
        )
    }

    /// Total count across replicas.
    pub fn total(value: &Datum) -> u64 {
        Self::entries(value).values().sum()
    }
}

impl LatticeOps for GCounter {
    fn bottom(&self) -> Datum {
        Datum::Map(BTreeMap::new())
    }

    fn join(&self, a: &Datum, b: &Datum) -> Datum {
        let mut merged = Self::entries(a);
        for (replica, count) in Self::entries(b) {
            let slot = merged.entry(replica).or_insert(0);
            *slot = (*slot).max(count);
        }
        Datum::Map(
            merged
                .into_iter()
                .map(|(replica, count)| (replica, Datum::Uint(count)))
                .collect(),
        )
    }

    fn leq(&self, a: &Datum, b: &Datum) -> bool {
        let right = Self::entries(b);
        Self::entries(a)
            .into_iter()
            .all(|(replica, count)| right.get(&replica).copied().unwrap_or(0) >= count)
    }
}

/// Max register over signed integers.
pub struct MaxInt;

impl MaxInt {
    fn int(value: &Datum) -> i64 {
        match value {
            Datum::Int(n) => *n,
            Datum::Uint(n) => i64::try_from(*n).unwrap_or(i64::MAX),
            _ => i64::MIN,
        }
    }
}

impl LatticeOps for MaxInt {
    fn bottom(&self) -> Datum {
        Datum::Int(i64::MIN)
    }

    fn join(&self, a: &Datum, b: &Datum) -> Datum {
        Datum::Int(Self::int(a).max(Self::int(b)))
    }

    fn leq(&self, a: &Datum, b: &Datum) -> bool {
        Self::int(a) <= Self::int(b)
    }
}

/// Grow-only set with union join.
pub struct GSet;

impl GSet {
    fn items(value: &Datum) -> BTreeSet<Datum> {
        match value {
            Datum::Set(set) => set.clone(),
            Datum::Nil => BTreeSet::new(),
            // A bare element reads as the singleton set.
            other => BTreeSet::from([other.clone()]),
        }
    }
}

impl LatticeOps for GSet {
    fn bottom(&self) -> Datum {
        Datum::Set(BTreeSet::new())
    }

    fn join(&self, a: &Datum, b: &Datum) -> Datum {
        let mut merged = Self::items(a);
        merged.extend(Self::items(b));
        Datum::Set(merged)
    }

    fn leq(&self, a: &Datum, b: &Datum) -> bool {
        Self::items(a).is_subset(&Self::items(b))
    }
}
