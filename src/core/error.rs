//! Error types for store operations.
//!
//! Kahn defines a small set of error conditions surfaced to callers through
//! the operation's reply slot. Suspended waiters are never woken with an
//! error originating in the core; they only ever observe a value.

use crate::store::id::VarId;
use thiserror::Error;

/// Common Kahn error conditions.
#[derive(Debug, Error)]
pub enum KahnError {
    /// A non-lattice cell is already bound to a different value.
    #[error("conflicting bind on {id}: cell is already bound to a different value")]
    ConflictingBind { id: VarId },

    /// A cell already exists at this id with a different type tag.
    #[error("declare conflict on {id}: existing cell has a different type tag")]
    DeclareConflict { id: VarId },

    /// Operation on an id that was never declared.
    #[error("unknown variable {id}")]
    UnknownVariable { id: VarId },

    /// Program not present in the program registry.
    #[error("unknown program {module}:{function}")]
    UnknownProgram { module: String, function: String },

    /// Feature the core explicitly does not support.
    #[error("not implemented: {operation}")]
    NotImplemented { operation: &'static str },

    /// The coordinator cannot resolve or reach an owner.
    ///
    /// Also returned when a reply channel is dropped before the owning
    /// partition answers, which is indistinguishable from a lost route
    /// from the caller's side.
    #[error("routing unavailable: {message}")]
    RoutingUnavailable { message: String },

    /// An alias-protocol message was dropped in transit.
    ///
    /// Never produced by the core itself, which cannot detect loss; a
    /// reader waiting behind the lost message stays suspended until its
    /// caller cancels. Reserved for transports that can detect loss.
    #[error("message lost: {message}")]
    MessageLost { message: String },

    /// Handoff snapshot encoding or decoding failed.
    #[error("handoff codec: {0}")]
    HandoffCodec(#[from] bincode::Error),
}

impl KahnError {
    /// Create a RoutingUnavailable error.
    pub fn routing_unavailable(message: impl Into<String>) -> Self {
        Self::RoutingUnavailable {
            message: message.into(),
        }
    }

    /// Check if this error reports a bind/declare conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ConflictingBind { .. } | Self::DeclareConflict { .. }
        )
    }
}

/// Result type using KahnError.
pub type KahnResult<T> = Result<T, KahnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_classification() {
        let id = VarId::fresh();
        assert!(KahnError::ConflictingBind { id }.is_conflict());
        assert!(KahnError::DeclareConflict { id }.is_conflict());
        assert!(!KahnError::UnknownVariable { id }.is_conflict());
    }

    #[test]
    fn display_includes_id() {
        let id = VarId::fresh();
        let message = KahnError::UnknownVariable { id }.to_string();
        assert!(message.contains(&id.to_string()));
    }
}
