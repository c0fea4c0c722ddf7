//! Per-cell waiter queue.
//!
//! A waiter is a suspended read parked on a cell. Plain waiters wake on the
//! bind that makes the cell bound; threshold waiters wake only once the
//! cell's lattice value has reached their observation point, and are
//! re-queued by every bind that falls short. Waiters are reply-capable
//! handles: a tokio oneshot sender carried from the suspended caller.

use crate::core::error::KahnResult;
use crate::lattice::registry::Threshold;
use crate::store::id::VarId;
use crate::store::value::Datum;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Handle key for a parked waiter, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterKey(pub u64);

impl std::fmt::Display for WaiterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "waiter_{}", self.0)
    }
}

/// Reply to a read: the observed value and the stream successor, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    /// The cell's value at observation time.
    pub value: Datum,
    /// The cell that continues the stream, when one was allocated.
    pub next: Option<VarId>,
}

/// Reply to a bind: the stream successor, if one was allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOutcome {
    /// Successor id to chain the next bind onto.
    pub next: Option<VarId>,
}

/// Reply slot for a suspended or immediate read.
pub type ReadSlot = oneshot::Sender<KahnResult<ReadReply>>;

/// Reply slot for a bind, carried through the alias protocol when the
/// bind resolves remotely.
pub type BindSlot = oneshot::Sender<KahnResult<BindOutcome>>;

/// Reply slot for an empty acknowledgement (`wait_needed` and the lazy
/// creator wake-up).
pub type AckSlot = oneshot::Sender<KahnResult<()>>;

/// Kind of a parked waiter.
#[derive(Debug)]
pub enum WaiterKind {
    /// Wake with the cell's value when it becomes bound.
    Plain,
    /// Wake only when the value has reached the threshold.
    Threshold(Threshold),
}

/// A suspended read parked on a cell.
#[derive(Debug)]
pub struct Waiter {
    /// Handle key for removal.
    pub key: WaiterKey,
    /// Wake condition.
    pub kind: WaiterKind,
    /// Reply slot to resume the caller.
    pub slot: ReadSlot,
}

/// Ordered queue of waiters parked on one cell.
///
/// Append-only while the cell is unbound; filtered on each bind. Plain
/// waiters all leave on the first bind, threshold waiters leave as their
/// predicate is met and are otherwise re-queued in order.
#[derive(Debug, Default)]
pub struct WaiterSet {
    entries: VecDeque<Waiter>,
}

impl WaiterSet {
    /// Create an empty waiter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parked waiters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no waiters are parked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Park a waiter.
    pub fn push(&mut self, waiter: Waiter) {
        self.entries.push_back(waiter);
    }

    /// Remove a parked waiter by its handle key.
    ///
    /// Returns true if a waiter was removed. The caller's reply slot is
    /// dropped with it; a cancelled reader observes a closed channel.
    pub fn remove(&mut self, key: WaiterKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|w| w.key != key);
        before != self.entries.len()
    }

    /// Split off every waiter whose wake condition now holds.
    ///
    /// Plain waiters are always ready; a threshold waiter is ready iff the
    /// supplied predicate accepts its threshold. Unready waiters keep their
    /// queue order. Each returned waiter leaves the set exactly once.
    pub fn split_ready<F>(&mut self, mut threshold_met: F) -> Vec<Waiter>
    where
        F: FnMut(&Threshold) -> bool,
    {
        let mut ready = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());

        for waiter in self.entries.drain(..) {
            let wake = match &waiter.kind {
                WaiterKind::Plain => true,
                WaiterKind::Threshold(threshold) => threshold_met(threshold),
            };
            if wake {
                ready.push(waiter);
            } else {
                kept.push_back(waiter);
            }
        }

        self.entries = kept;
        ready
    }
}
