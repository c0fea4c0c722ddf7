//! The cell record stored at each variable id.

use crate::store::id::VarId;
use crate::store::value::{Datum, TypeTag, Value};
use crate::store::waiters::{AckSlot, WaiterSet};
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// State flags for a cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u8 {
        /// Cell has been assigned. Lattice cells carry this from creation.
        const BOUND = 0b0000_0001;
        /// Reads drive production: the first read wakes the creator.
        const LAZY = 0b0000_0010;
    }
}

/// The record stored at a variable id.
///
/// Mutated only by the partition that owns the id. Waiters and the lazy
/// creator are live reply handles and never leave the owning partition.
#[derive(Debug)]
pub struct Cell {
    /// Optional type tag; lattice semantics iff the tag is registered.
    pub type_tag: Option<TypeTag>,

    /// Current value.
    pub value: Value,

    /// State flags.
    pub flags: CellFlags,

    /// The cell that continues the stream after this one.
    pub next: Option<VarId>,

    /// Suspended reads parked on this cell.
    pub waiters: WaiterSet,

    /// Variables bound to this cell, notified on every bind.
    pub aliases: Vec<VarId>,

    /// Reply handle of a lazy producer parked in `wait_needed`.
    pub creator: Option<AckSlot>,
}

impl Cell {
    /// Create an unbound cell with an optional opaque type tag.
    pub fn unbound(type_tag: Option<TypeTag>) -> Self {
        Self {
            type_tag,
            value: Value::Bottom,
            flags: CellFlags::empty(),
            next: None,
            waiters: WaiterSet::new(),
            aliases: Vec::new(),
            creator: None,
        }
    }

    /// Create a lattice cell, bound from creation at the lattice bottom.
    pub fn lattice(type_tag: TypeTag, bottom: Datum) -> Self {
        Self {
            type_tag: Some(type_tag),
            value: Value::Concrete(bottom),
            flags: CellFlags::BOUND,
            next: None,
            waiters: WaiterSet::new(),
            aliases: Vec::new(),
            creator: None,
        }
    }

    /// Check if the cell has been assigned.
    pub fn is_bound(&self) -> bool {
        self.flags.contains(CellFlags::BOUND)
    }

    /// Check if reads drive production on this cell.
    pub fn is_lazy(&self) -> bool {
        self.flags.contains(CellFlags::LAZY)
    }

    /// Mark the cell bound.
    pub fn set_bound(&mut self) {
        self.flags.insert(CellFlags::BOUND);
    }

    /// Mark the cell lazy.
    pub fn set_lazy(&mut self) {
        self.flags.insert(CellFlags::LAZY);
    }

    /// The concrete datum of a bound cell.
    ///
    /// A bound cell always holds a concrete value; the alias marker only
    /// ever appears on unbound cells.
    pub fn concrete_value(&self) -> Option<&Datum> {
        self.value.as_concrete()
    }

    /// Snapshot of the transferable state, for `reply_fetch` and handoff.
    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            value: self.value.clone(),
            next: self.next,
            type_tag: self.type_tag.clone(),
            bound: self.is_bound(),
        }
    }

    /// Rebuild a cell from a snapshot, with empty waiter and alias state.
    pub fn from_snapshot(snapshot: CellSnapshot) -> Self {
        let mut flags = CellFlags::empty();
        if snapshot.bound {
            flags.insert(CellFlags::BOUND);
        }
        Self {
            type_tag: snapshot.type_tag,
            value: snapshot.value,
            flags,
            next: snapshot.next,
            waiters: WaiterSet::new(),
            aliases: Vec::new(),
            creator: None,
        }
    }
}

/// Transferable snapshot of a cell: the `reply_fetch` payload and the
/// handoff record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Value at snapshot time.
    pub value: Value,
    /// Stream successor at snapshot time.
    pub next: Option<VarId>,
    /// Type tag.
    pub type_tag: Option<TypeTag>,
    /// Whether the cell was bound.
    pub bound: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_cell_starts_empty() {
        let cell = Cell::unbound(None);
        assert!(!cell.is_bound());
        assert!(!cell.is_lazy());
        assert_eq!(cell.value, Value::Bottom);
        assert!(cell.next.is_none());
    }

    #[test]
    fn lattice_cell_is_bound_at_bottom() {
        let cell = Cell::lattice(TypeTag::new("maxint"), Datum::Int(i64::MIN));
        assert!(cell.is_bound());
        assert_eq!(cell.concrete_value(), Some(&Datum::Int(i64::MIN)));
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut cell = Cell::unbound(Some(TypeTag::new("blob")));
        cell.next = Some(VarId::fresh());
        let snap = cell.snapshot();
        let rebuilt = Cell::from_snapshot(snap.clone());
        assert_eq!(rebuilt.snapshot(), snap);
        assert!(rebuilt.waiters.is_empty());
    }
}
