//! Variable store: cells, values, waiters, and the per-partition map.
//!
//! - [`id`] - variable and thread identifiers
//! - [`value`] - type tags, concrete data, and the cell value shapes
//! - [`cell`] - the cell record and its transferable snapshot
//! - [`waiters`] - suspended reads parked on a cell
//! - [`var_store`] - the per-partition id-to-cell map and handoff codec

pub mod cell;
pub mod id;
pub mod value;
pub mod var_store;
pub mod waiters;
