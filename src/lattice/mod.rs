//! Lattice registry and built-in lattice types.
//!
//! - [`registry`] - tag classification, bottom, join, threshold evaluation
//! - [`types`] - built-in join-semilattices (gcounter, maxint, gset)

pub mod registry;
pub mod types;
