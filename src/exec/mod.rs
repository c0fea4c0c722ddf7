//! Core executor and its effect model.
//!
//! - [`executor`] - declare/bind/read/is_det/wait_needed/next over a local
//!   store, plus the alias protocol handlers
//! - [`effects`] - replies and cross-partition messages an operation emits

pub mod effects;
pub mod executor;
