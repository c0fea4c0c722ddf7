//! Partitioned coordination layer.
//!
//! - [`routing`] - pure id-to-partition hash
//! - [`partition`] - partition tasks owning store shards
//! - [`coordinator`] - caller-facing operation surface and message routing
//! - [`programs`] - program host interface for the `thread` operation

pub mod coordinator;
pub mod partition;
pub mod programs;
pub mod routing;
