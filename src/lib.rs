//! Kahn - deterministic dataflow variable store.
//!
//! Kahn is the runtime substrate for a deterministic parallel programming
//! model in the tradition of Kahn networks and LVars: a partitioned
//! single-assignment store whose values may form a join-semilattice.
//! Producers bind variables monotonically; consumers read at a chosen
//! observation point and are suspended until the variable's value has
//! advanced past it. Linked successor cells turn single-assignment
//! variables into ordered streams, and a variable may be bound to another
//! variable's identifier, with the target's value propagating back across
//! partitions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Partition Coordinator                       │
//! │        (id routing, reply slots, fetch / notify fan-out)        │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Partition Tasks                           │
//! │            (one owner per shard, serialized commands)           │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Core Executor                            │
//! │   declare │ bind │ read │ is_det │ wait_needed │ next │ alias   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Variable Store │ Lattice Registry              │
//! │      cells, waiters, successors │ bottom, join, thresholds      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::error`] - Error types
//! - [`core::runtime`] - Runtime lifecycle orchestration
//!
//! ## Store
//! - [`store::cell`] - Cell records and transferable snapshots
//! - [`store::waiters`] - Suspended reads parked on a cell
//! - [`store::var_store`] - Per-partition id-to-cell map and handoff
//!
//! ## Executor
//! - [`exec::executor`] - Operations over a partition-local store
//! - [`exec::effects`] - Replies and cross-partition messages
//!
//! ## Lattices
//! - [`lattice::registry`] - Tag classification and threshold evaluation
//! - [`lattice::types`] - Built-in join-semilattices
//!
//! ## Cluster
//! - [`cluster::routing`] - Pure id-to-partition hash
//! - [`cluster::partition`] - Partition tasks and their command mailbox
//! - [`cluster::coordinator`] - Caller-facing operation surface
//! - [`cluster::programs`] - Program host for the `thread` operation
//!
//! # Key Invariants
//!
//! - **SINGLE-OWNER**: every cell is mutated only by its owning partition
//! - **MONOTONE**: a lattice cell's value only moves up the lattice order
//! - **SINGLE-ASSIGN**: a non-lattice cell binds once; conflicting rebinds
//!   fail, equal rebinds are idempotent
//! - **WAKE-ONCE**: a waiter is woken at most once, and only in a state
//!   where its wake condition holds

// Core infrastructure
pub mod core;

// Lattice registry and built-in types
pub mod lattice;

// Variable store
pub mod store;

// Core executor
pub mod exec;

// Partitioned coordination
pub mod cluster;

// Re-exports for convenience
pub use self::core::{config, error, runtime};
pub use cluster::{coordinator, partition, programs, routing};
pub use exec::{effects, executor};
pub use lattice::{registry, types};
pub use store::{cell, id, value, var_store, waiters};
