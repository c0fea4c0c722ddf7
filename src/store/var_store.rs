//! Per-partition variable store.
//!
//! An in-memory map from variable id to cell, owned exclusively by one
//! partition task. All mutations to a cell happen on that task, which makes
//! per-cell updates linearizable without locking. Contents are lost when
//! the process restarts; handoff snapshots exist for cluster rebalancing,
//! not durability.

use crate::core::error::KahnResult;
use crate::store::cell::{Cell, CellSnapshot};
use crate::store::id::VarId;
use std::collections::HashMap;

/// Per-partition map from variable id to cell.
#[derive(Debug, Default)]
pub struct VarStore {
    cells: HashMap<VarId, Cell>,
}

impl VarStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the store holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if a cell exists at this id.
    pub fn contains(&self, id: &VarId) -> bool {
        self.cells.contains_key(id)
    }

    /// Get a cell.
    pub fn get(&self, id: &VarId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Get a mutable cell.
    pub fn get_mut(&mut self, id: &VarId) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    /// Insert a cell only if the id is free.
    ///
    /// Returns false when a cell already exists; the existing cell is
    /// left untouched.
    pub fn insert_if_absent(&mut self, id: VarId, cell: Cell) -> bool {
        match self.cells.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(cell);
                true
            }
        }
    }

    /// Get a mutable cell, creating it with the given constructor when the
    /// id was never declared here.
    pub fn get_or_insert_with<F>(&mut self, id: VarId, make: F) -> &mut Cell
    where
        F: FnOnce() -> Cell,
    {
        self.cells.entry(id).or_insert_with(make)
    }

    /// Store statistics.
    pub fn stats(&self) -> StoreStats {
        let mut bound_cells = 0;
        let mut parked_waiters = 0;
        let mut alias_edges = 0;
        let mut lazy_cells = 0;
        for cell in self.cells.values() {
            if cell.is_bound() {
                bound_cells += 1;
            }
            if cell.is_lazy() {
                lazy_cells += 1;
            }
            parked_waiters += cell.waiters.len();
            alias_edges += cell.aliases.len();
        }
        StoreStats {
            cell_count: self.cells.len(),
            bound_cells,
            parked_waiters,
            alias_edges,
            lazy_cells,
        }
    }

    /// Export every cell as a deterministic, ordered snapshot list.
    pub fn export_snapshots(&self) -> Vec<(VarId, CellSnapshot)> {
        let mut records: Vec<(VarId, CellSnapshot)> = self
            .cells
            .iter()
            .map(|(id, cell)| (*id, cell.snapshot()))
            .collect();
        records.sort_by_key(|(id, _)| *id);
        records
    }

    /// Encode the store for handoff.
    pub fn encode_handoff(&self) -> KahnResult<Vec<u8>> {
        let records = self.export_snapshots();
        Ok(bincode::serialize(&records)?)
    }

    /// Import a handoff payload, insert-if-absent.
    ///
    /// Cells already present keep their local state, including any parked
    /// waiters. Returns the number of cells inserted.
    pub fn import_handoff(&mut self, bytes: &[u8]) -> KahnResult<usize> {
        let records: Vec<(VarId, CellSnapshot)> = bincode::deserialize(bytes)?;
        let mut inserted = 0;
        for (id, snapshot) in records {
            if self.insert_if_absent(id, Cell::from_snapshot(snapshot)) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

/// Statistics for a partition's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of cells.
    pub cell_count: usize,
    /// Cells with an assigned value.
    pub bound_cells: usize,
    /// Waiters parked across all cells.
    pub parked_waiters: usize,
    /// Alias back-references across all cells.
    pub alias_edges: usize,
    /// Cells marked lazy by a parked or released producer.
    pub lazy_cells: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::value::{Datum, TypeTag, Value};

    #[test]
    fn insert_if_absent_keeps_existing() {
        let mut store = VarStore::new();
        let id = VarId::fresh();
        assert!(store.insert_if_absent(id, Cell::unbound(None)));
        assert!(!store.insert_if_absent(id, Cell::unbound(Some(TypeTag::new("x")))));
        assert!(store.get(&id).unwrap().type_tag.is_none());
    }

    #[test]
    fn handoff_roundtrip_is_insert_if_absent() {
        let mut source = VarStore::new();
        let bound = VarId::fresh();
        let mut cell = Cell::unbound(None);
        cell.value = Value::Concrete(Datum::Int(9));
        cell.set_bound();
        source.insert_if_absent(bound, cell);

        let bytes = source.encode_handoff().unwrap();

        let mut target = VarStore::new();
        target.insert_if_absent(bound, Cell::unbound(None));
        let inserted = target.import_handoff(&bytes).unwrap();

        // The pre-existing cell wins; nothing new to insert.
        assert_eq!(inserted, 0);
        assert!(!target.get(&bound).unwrap().is_bound());

        let mut empty = VarStore::new();
        assert_eq!(empty.import_handoff(&bytes).unwrap(), 1);
        assert!(empty.get(&bound).unwrap().is_bound());
    }
}
