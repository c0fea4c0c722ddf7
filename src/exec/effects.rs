//! Effects produced by executor operations.
//!
//! The executor is a synchronous function over one partition's store. It
//! never performs IO itself; every operation returns the replies to deliver
//! and the cross-partition messages to route. The partition task performs
//! both after the store mutation completes, which keeps the core
//! deterministic and testable without a runtime.

use crate::core::error::KahnResult;
use crate::store::cell::CellSnapshot;
use crate::store::id::VarId;
use crate::store::value::{Datum, TypeTag};
use crate::store::waiters::{AckSlot, BindOutcome, BindSlot, ReadReply, ReadSlot};

/// A reply to deliver to a caller: an immediate answer or a waiter wake-up.
#[derive(Debug)]
pub enum Reply {
    /// Resume a read with its result.
    Read {
        slot: ReadSlot,
        result: KahnResult<ReadReply>,
    },
    /// Answer a bind.
    Bind {
        slot: BindSlot,
        result: KahnResult<BindOutcome>,
    },
    /// Empty acknowledgement (`wait_needed`, lazy creator wake-up).
    Ack {
        slot: AckSlot,
        result: KahnResult<()>,
    },
}

impl Reply {
    /// Deliver the reply. A receiver that went away is ignored; the
    /// cancelled caller already stopped listening.
    pub fn deliver(self) {
        match self {
            Self::Read { slot, result } => {
                let _ = slot.send(result);
            }
            Self::Bind { slot, result } => {
                let _ = slot.send(result);
            }
            Self::Ack { slot, result } => {
                let _ = slot.send(result);
            }
        }
    }
}

/// A cross-partition message to route to the owner of its target id.
#[derive(Debug)]
pub enum Outbound {
    /// Declare a freshly allocated successor cell on its owning partition.
    Declare {
        id: VarId,
        type_tag: Option<TypeTag>,
    },
    /// Ask the owner of `target` for its cell on behalf of `from`, which
    /// was bound to `target`'s identifier. The bind caller's reply slot
    /// rides along until the protocol resolves.
    Fetch {
        target: VarId,
        from: VarId,
        reply: BindSlot,
    },
    /// Answer a fetch with a snapshot of the target cell.
    ReplyFetch {
        from: VarId,
        snapshot: CellSnapshot,
        reply: BindSlot,
    },
    /// Propagate a bound value to an alias.
    NotifyValue { id: VarId, value: Datum },
}

impl Outbound {
    /// The id whose owner this message must be routed to.
    pub fn route_id(&self) -> VarId {
        match self {
            Self::Declare { id, .. } => *id,
            Self::Fetch { target, .. } => *target,
            Self::ReplyFetch { from, .. } => *from,
            Self::NotifyValue { id, .. } => *id,
        }
    }
}

/// Replies and outbound messages produced by one executor operation.
#[derive(Debug, Default)]
pub struct Effects {
    /// Replies to deliver, in order.
    pub replies: Vec<Reply>,
    /// Cross-partition messages to route, in order.
    pub outbound: Vec<Outbound>,
}

impl Effects {
    /// Create an empty effect set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn reply(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    /// Queue an outbound message.
    pub fn send(&mut self, message: Outbound) {
        self.outbound.push(message);
    }

    /// Check if the operation produced nothing to do.
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty() && self.outbound.is_empty()
    }
}
