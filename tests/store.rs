//! Tests for the variable store: cells, snapshots, and handoff.

use kahn::store::cell::{Cell, CellSnapshot};
use kahn::store::id::VarId;
use kahn::store::value::{Datum, TypeTag, Value};
use kahn::store::var_store::VarStore;

fn bound_cell(value: Datum) -> Cell {
    let mut cell = Cell::unbound(None);
    cell.value = Value::Concrete(value);
    cell.set_bound();
    cell
}

// ============================================================================
// Cell state
// ============================================================================

#[test]
fn alias_marker_only_on_unbound_cells() {
    let mut cell = Cell::unbound(None);
    cell.value = Value::Alias(VarId::fresh());
    assert!(!cell.is_bound());
    assert!(cell.concrete_value().is_none());
}

#[test]
fn snapshot_carries_value_next_type_bound() {
    let mut cell = Cell::unbound(Some(TypeTag::new("blob")));
    cell.next = Some(VarId::fresh());
    let snapshot = cell.snapshot();
    assert_eq!(snapshot.type_tag, Some(TypeTag::new("blob")));
    assert_eq!(snapshot.next, cell.next);
    assert!(!snapshot.bound);
    assert_eq!(snapshot.value, Value::Bottom);
}

#[test]
fn snapshot_rebuild_drops_live_state() {
    let id = VarId::fresh();
    let mut cell = bound_cell(Datum::Int(5));
    cell.aliases.push(id);

    let rebuilt = Cell::from_snapshot(cell.snapshot());
    assert!(rebuilt.is_bound());
    assert!(rebuilt.aliases.is_empty());
    assert!(rebuilt.waiters.is_empty());
    assert!(rebuilt.creator.is_none());
}

// ============================================================================
// Store map
// ============================================================================

#[test]
fn store_tracks_stats() {
    let mut store = VarStore::new();
    store.insert_if_absent(VarId::fresh(), Cell::unbound(None));
    store.insert_if_absent(VarId::fresh(), bound_cell(Datum::Int(1)));

    let mut lazy = Cell::unbound(None);
    lazy.set_lazy();
    store.insert_if_absent(VarId::fresh(), lazy);

    let stats = store.stats();
    assert_eq!(stats.cell_count, 3);
    assert_eq!(stats.bound_cells, 1);
    assert_eq!(stats.lazy_cells, 1);
    assert_eq!(stats.parked_waiters, 0);
    assert_eq!(stats.alias_edges, 0);
}

#[test]
fn get_or_insert_with_materializes_once() {
    let mut store = VarStore::new();
    let id = VarId::fresh();
    store.get_or_insert_with(id, || Cell::unbound(Some(TypeTag::new("x"))));
    // Second call must not replace the cell.
    store.get_or_insert_with(id, || Cell::unbound(None));
    assert_eq!(store.get(&id).unwrap().type_tag, Some(TypeTag::new("x")));
    assert_eq!(store.len(), 1);
}

// ============================================================================
// Handoff
// ============================================================================

#[test]
fn export_is_deterministically_ordered() {
    let mut store = VarStore::new();
    for value in 0..8 {
        store.insert_if_absent(VarId::fresh(), bound_cell(Datum::Int(value)));
    }
    let first = store.export_snapshots();
    let second = store.export_snapshots();
    assert_eq!(first, second);
    let mut ids: Vec<VarId> = first.iter().map(|(id, _)| *id).collect();
    let sorted = {
        let mut v = ids.clone();
        v.sort();
        v
    };
    assert_eq!(ids, sorted);
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[test]
fn handoff_encode_decode_preserves_cells() {
    let mut store = VarStore::new();
    let plain = VarId::fresh();
    let aliased = VarId::fresh();
    let target = VarId::fresh();

    store.insert_if_absent(plain, bound_cell(Datum::str("v")));
    let mut alias_cell = Cell::unbound(None);
    alias_cell.value = Value::Alias(target);
    store.insert_if_absent(aliased, alias_cell);

    let bytes = store.encode_handoff().unwrap();
    let mut restored = VarStore::new();
    assert_eq!(restored.import_handoff(&bytes).unwrap(), 2);

    assert_eq!(
        restored.get(&plain).unwrap().concrete_value(),
        Some(&Datum::str("v"))
    );
    assert_eq!(restored.get(&aliased).unwrap().value, Value::Alias(target));
}

#[test]
fn import_rejects_garbage() {
    let mut store = VarStore::new();
    assert!(store.import_handoff(b"not a handoff payload").is_err());
}

#[test]
fn snapshot_codec_roundtrip() {
    let snapshot = CellSnapshot {
        value: Value::Concrete(Datum::set([Datum::Int(1), Datum::str("s")])),
        next: Some(VarId::fresh()),
        type_tag: Some(TypeTag::new("gset")),
        bound: true,
    };
    let bytes = bincode::serialize(&snapshot).unwrap();
    let decoded: CellSnapshot = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, snapshot);
}
