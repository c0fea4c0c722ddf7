//! Lattice registry and threshold evaluation.
//!
//! The registry is the single place where lattice polymorphism lives. Every
//! other component treats values opaquely and asks the registry three
//! questions: is this tag a lattice, what is its bottom, and has a value
//! reached a threshold. The registry is built once at startup and is
//! read-only afterwards.

use crate::store::value::{Datum, TypeTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Observation point for a threshold read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Threshold {
    /// Met iff the threshold is at or below the value in the lattice order.
    AtLeast(Datum),
    /// Met iff the threshold is strictly below the value.
    StrictlyGreater(Datum),
}

/// Operations a lattice type provides.
///
/// Implementations must be total: malformed inputs join leniently rather
/// than failing, since the executor treats all data opaquely.
pub trait LatticeOps: Send + Sync {
    /// The least element.
    fn bottom(&self) -> Datum;

    /// Least upper bound. Commutative, associative, idempotent.
    fn join(&self, a: &Datum, b: &Datum) -> Datum;

    /// Partial order: `a` at or below `b`.
    fn leq(&self, a: &Datum, b: &Datum) -> bool;
}

/// Registry of lattice type tags.
pub struct LatticeRegistry {
    entries: HashMap<String, Arc<dyn LatticeOps>>,
}

impl LatticeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry with the built-in lattice types registered:
    /// `gcounter`, `maxint`, and `gset`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("gcounter", Arc::new(super::types::GCounter));
        registry.register("maxint", Arc::new(super::types::MaxInt));
        registry.register("gset", Arc::new(super::types::GSet));
        registry
    }

    /// Register a lattice type. Intended for startup only; the registry is
    /// shared read-only once the runtime starts.
    pub fn register(&mut self, tag: impl Into<String>, ops: Arc<dyn LatticeOps>) {
        self.entries.insert(tag.into(), ops);
    }

    /// Membership test: is this tag a registered lattice type.
    pub fn is_lattice(&self, tag: &TypeTag) -> bool {
        self.entries.contains_key(tag.as_str())
    }

    /// The least element of a lattice type.
    pub fn bottom(&self, tag: &TypeTag) -> Option<Datum> {
        self.entries.get(tag.as_str()).map(|ops| ops.bottom())
    }

    /// Least upper bound of two values of a lattice type.
    pub fn join(&self, tag: &TypeTag, a: &Datum, b: &Datum) -> Option<Datum> {
        self.entries.get(tag.as_str()).map(|ops| ops.join(a, b))
    }

    /// Partial order test of a lattice type.
    pub fn leq(&self, tag: &TypeTag, a: &Datum, b: &Datum) -> bool {
        self.entries
            .get(tag.as_str())
            .is_some_and(|ops| ops.leq(a, b))
    }

    /// Decide whether a value has reached the observation point.
    ///
    /// Unknown tags never meet any threshold; threshold waiters only ever
    /// park on cells whose tag is registered.
    pub fn threshold_met(&self, tag: &TypeTag, value: &Datum, threshold: &Threshold) -> bool {
        let Some(ops) = self.entries.get(tag.as_str()) else {
            return false;
        };
        match threshold {
            Threshold::AtLeast(t) => ops.leq(t, value),
            Threshold::StrictlyGreater(t) => ops.leq(t, value) && !ops.leq(value, t),
        }
    }

    /// Registered tag count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no tags are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LatticeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
