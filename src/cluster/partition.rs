//! Partition task: single owner of one shard of the variable store.
//!
//! Each partition is a task that exclusively owns its [`VarStore`].
//! Commands arrive on an unbounded mailbox and are applied one at a time,
//! so all mutations to a cell are serialized by its owner. The executor
//! returns explicit effects; the partition delivers the replies and routes
//! the cross-partition messages after each store mutation completes.

use crate::core::error::KahnResult;
use crate::exec::effects::{Effects, Outbound};
use crate::exec::executor::{BindPayload, Executor};
use crate::lattice::registry::Threshold;
use crate::store::cell::CellSnapshot;
use crate::store::id::{ThreadId, VarId};
use crate::store::value::{Datum, TypeTag};
use crate::store::var_store::{StoreStats, VarStore};
use crate::store::waiters::{AckSlot, BindSlot, ReadSlot, WaiterKey};
use tokio::sync::{mpsc, oneshot, watch};

use super::coordinator::Coordinator;
use super::programs::ProgramHost;

/// A command addressed to the partition owning its target id.
///
/// Synchronous operations carry a reply slot; the alias-protocol messages
/// and successor declares are fire-and-forget.
#[derive(Debug)]
pub enum Command {
    /// Create a cell, insert-if-absent.
    Declare {
        id: VarId,
        type_tag: Option<TypeTag>,
        reply: oneshot::Sender<KahnResult<VarId>>,
    },
    /// Bind a value or alias.
    Bind {
        id: VarId,
        payload: BindPayload,
        reply: BindSlot,
    },
    /// Read, optionally at a threshold; may park the caller.
    Read {
        id: VarId,
        threshold: Option<Threshold>,
        waiter: WaiterKey,
        reply: ReadSlot,
    },
    /// Bound-flag query.
    IsDet {
        id: VarId,
        reply: oneshot::Sender<KahnResult<bool>>,
    },
    /// Return or allocate the stream successor.
    Next {
        id: VarId,
        reply: oneshot::Sender<KahnResult<VarId>>,
    },
    /// Park a lazy producer until demand arrives.
    WaitNeeded { id: VarId, reply: AckSlot },
    /// Remove a parked waiter.
    Cancel { id: VarId, waiter: WaiterKey },
    /// Spawn a named user computation on this partition.
    Thread {
        module: String,
        function: String,
        args: Vec<Datum>,
        reply: oneshot::Sender<KahnResult<ThreadId>>,
    },
    /// Alias protocol: request the target cell on behalf of `from`.
    Fetch {
        target: VarId,
        from: VarId,
        reply: BindSlot,
    },
    /// Alias protocol: snapshot answer for a fetch.
    ReplyFetch {
        from: VarId,
        snapshot: CellSnapshot,
        reply: BindSlot,
    },
    /// Alias protocol: propagate a bound value to an alias.
    NotifyValue { id: VarId, value: Datum },
    /// Declare a successor cell allocated by another partition.
    DeclareRemote {
        id: VarId,
        type_tag: Option<TypeTag>,
    },
    /// Encode this partition's cells for handoff.
    Export {
        reply: oneshot::Sender<KahnResult<Vec<u8>>>,
    },
    /// Merge a handoff payload, insert-if-absent.
    Import {
        bytes: Vec<u8>,
        reply: oneshot::Sender<KahnResult<usize>>,
    },
    /// Store statistics.
    Stats { reply: oneshot::Sender<StoreStats> },
}

/// One partition: its store, its executor, and its mailbox.
pub struct Partition {
    index: u32,
    store: VarStore,
    executor: Executor,
    coordinator: Coordinator,
}

impl Partition {
    /// Create a partition shard.
    pub fn new(index: u32, executor: Executor, coordinator: Coordinator) -> Self {
        Self {
            index,
            store: VarStore::new(),
            executor,
            coordinator,
        }
    }

    /// Run the partition until shutdown or mailbox close.
    pub async fn run(
        mut self,
        mut mailbox: mpsc::UnboundedReceiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!(partition = self.index, "partition started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                command = mailbox.recv() => {
                    match command {
                        None => break,
                        Some(command) => self.handle(command),
                    }
                }
            }
        }
        tracing::debug!(
            partition = self.index,
            cells = self.store.len(),
            "partition stopped"
        );
    }

    /// Apply one command and perform its effects.
    fn handle(&mut self, command: Command) {
        match command {
            Command::Declare {
                id,
                type_tag,
                reply,
            } => {
                let result = self.executor.declare(&mut self.store, Some(id), type_tag);
                let _ = reply.send(result);
            }
            Command::Bind { id, payload, reply } => {
                let fx = self.executor.bind(&mut self.store, id, payload, reply);
                self.dispatch(fx);
            }
            Command::Read {
                id,
                threshold,
                waiter,
                reply,
            } => {
                let fx = self
                    .executor
                    .read(&mut self.store, id, threshold, waiter, reply);
                self.dispatch(fx);
            }
            Command::IsDet { id, reply } => {
                let _ = reply.send(self.executor.is_det(&self.store, id));
            }
            Command::Next { id, reply } => {
                let (result, fx) = self.executor.next(&mut self.store, id);
                self.dispatch(fx);
                let _ = reply.send(result);
            }
            Command::WaitNeeded { id, reply } => {
                let fx = self.executor.wait_needed(&mut self.store, id, reply);
                self.dispatch(fx);
            }
            Command::Cancel { id, waiter } => {
                self.executor.cancel(&mut self.store, id, waiter);
            }
            Command::Thread {
                module,
                function,
                args,
                reply,
            } => {
                let result = self.coordinator.programs().spawn(
                    &module,
                    &function,
                    args,
                    self.coordinator.clone(),
                );
                let _ = reply.send(result);
            }
            Command::Fetch {
                target,
                from,
                reply,
            } => {
                let fx = self
                    .executor
                    .apply_fetch(&mut self.store, target, from, reply);
                self.dispatch(fx);
            }
            Command::ReplyFetch {
                from,
                snapshot,
                reply,
            } => {
                let fx = self
                    .executor
                    .apply_reply_fetch(&mut self.store, from, snapshot, reply);
                self.dispatch(fx);
            }
            Command::NotifyValue { id, value } => {
                let fx = self.executor.apply_notify(&mut self.store, id, value);
                self.dispatch(fx);
            }
            Command::DeclareRemote { id, type_tag } => {
                let fx = self.executor.declare_remote(&mut self.store, id, type_tag);
                self.dispatch(fx);
            }
            Command::Export { reply } => {
                let _ = reply.send(self.store.encode_handoff());
            }
            Command::Import { bytes, reply } => {
                let _ = reply.send(self.store.import_handoff(&bytes));
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.store.stats());
            }
        }
    }

    /// Route outbound messages, then deliver replies.
    ///
    /// Outbound first: a successor declare must be queued at its owner
    /// before the caller can learn the successor id from its reply.
    fn dispatch(&mut self, fx: Effects) {
        if fx.is_empty() {
            return;
        }
        for message in fx.outbound {
            let target = message.route_id();
            let command = match message {
                Outbound::Declare { id, type_tag } => Command::DeclareRemote { id, type_tag },
                Outbound::Fetch {
                    target,
                    from,
                    reply,
                } => Command::Fetch {
                    target,
                    from,
                    reply,
                },
                Outbound::ReplyFetch {
                    from,
                    snapshot,
                    reply,
                } => Command::ReplyFetch {
                    from,
                    snapshot,
                    reply,
                },
                Outbound::NotifyValue { id, value } => Command::NotifyValue { id, value },
            };
            if let Err(error) = self.coordinator.route(target, command) {
                // Best-effort delivery: a waiter behind this message stays
                // suspended until its caller cancels.
                tracing::warn!(partition = self.index, %error, "cross-partition message lost");
            }
        }
        for reply in fx.replies {
            reply.deliver();
        }
    }
}
