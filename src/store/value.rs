//! Cell values and type tags.
//!
//! A cell's value is one of three shapes: the unassigned bottom, a concrete
//! datum, or an alias marker pointing at another variable. Concrete data is
//! a closed, totally ordered value enum so set- and map-shaped lattices
//! compose without custom ordering glue.

use crate::store::id::VarId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Type tag attached to a cell at declaration.
///
/// A tag is lattice-typed iff it is present in the lattice registry;
/// every other tag is carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeTag(String);

impl TypeTag {
    /// Create a type tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the tag name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A concrete datum stored in a bound cell.
///
/// `Nil` is the designated empty sentinel: binding it terminates a stream,
/// so no successor cell is allocated for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Datum {
    /// Empty sentinel; terminates a stream when bound.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered set of data.
    Set(BTreeSet<Datum>),
    /// Ordered string-keyed map of data.
    Map(BTreeMap<String, Datum>),
}

impl Datum {
    /// Check for the empty sentinel.
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Build a string datum.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Build a set datum from an iterator.
    pub fn set(items: impl IntoIterator<Item = Datum>) -> Self {
        Self::Set(items.into_iter().collect())
    }

    /// Build a map datum from an iterator of string-keyed entries.
    pub fn map(entries: impl IntoIterator<Item = (String, Datum)>) -> Self {
        Self::Map(entries.into_iter().collect())
    }
}

/// The value held by a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Unassigned.
    Bottom,
    /// Concrete datum; the only shape a bound cell may hold.
    Concrete(Datum),
    /// Alias marker: this cell is bound to another variable's identifier
    /// and resolves when that variable's value propagates back.
    Alias(VarId),
}

impl Value {
    /// Check for the alias marker.
    pub fn is_alias(&self) -> bool {
        matches!(self, Self::Alias(_))
    }

    /// Get the concrete datum, if this value is concrete.
    pub fn as_concrete(&self) -> Option<&Datum> {
        match self {
            Self::Concrete(datum) => Some(datum),
            _ => None,
        }
    }

    /// Get the alias target, if this value is an alias marker.
    pub fn alias_target(&self) -> Option<VarId> {
        match self {
            Self::Alias(id) => Some(*id),
            _ => None,
        }
    }
}
