//! Identifiers for variables and spawned threads.
//!
//! All ids are UUIDs; a variable id is globally unique and routable to
//! exactly one owning partition by a pure hash of its bytes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Variable identifier - names a single cell across the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(Uuid);

impl VarId {
    /// Allocate a fresh, globally unique VarId.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw UUID bytes, used by the routing hash.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "var_{}", self.0)
    }
}

/// Thread identifier - opaque handle for a spawned execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(Uuid);

impl ThreadId {
    /// Allocate a fresh ThreadId.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "thr_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = VarId::fresh();
        let b = VarId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn bytes_roundtrip() {
        let a = VarId::fresh();
        let b = VarId::from_bytes(*a.as_bytes());
        assert_eq!(a, b);
    }
}
