//! Partition coordinator: the caller-facing surface of the store.
//!
//! The coordinator hashes each target id to its owning partition and
//! forwards the operation there. Synchronous operations (declare, bind,
//! read, is_det, next, wait_needed, thread) await a reply slot; the
//! alias-protocol messages it carries between partitions are asynchronous
//! and never block a partition on another.

use crate::core::error::{KahnError, KahnResult};
use crate::exec::executor::BindPayload;
use crate::lattice::registry::Threshold;
use crate::store::id::{ThreadId, VarId};
use crate::store::value::{Datum, TypeTag};
use crate::store::var_store::StoreStats;
use crate::store::waiters::{BindOutcome, ReadReply, WaiterKey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::partition::Command;
use super::programs::ProgramHost;
use super::routing::RoutingTable;

struct CoordinatorInner {
    routing: RoutingTable,
    mailboxes: Vec<mpsc::UnboundedSender<Command>>,
    programs: Arc<dyn ProgramHost>,
    waiter_seq: AtomicU64,
}

/// Cheap-to-clone handle for issuing operations against the store.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl Coordinator {
    /// Assemble a coordinator over partition mailboxes.
    ///
    /// The mailbox vector length must match the routing table's partition
    /// count; the runtime constructs both from the same configuration.
    pub fn new(
        routing: RoutingTable,
        mailboxes: Vec<mpsc::UnboundedSender<Command>>,
        programs: Arc<dyn ProgramHost>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                routing,
                mailboxes,
                programs,
                waiter_seq: AtomicU64::new(1),
            }),
        }
    }

    /// Number of partitions.
    pub fn partitions(&self) -> u32 {
        self.inner.routing.partitions()
    }

    /// The installed program host.
    pub(crate) fn programs(&self) -> &Arc<dyn ProgramHost> {
        &self.inner.programs
    }

    /// Allocate a handle key for a cancellable read.
    pub fn waiter_key(&self) -> WaiterKey {
        WaiterKey(self.inner.waiter_seq.fetch_add(1, Ordering::Relaxed))
    }

    /// Route a command to the partition owning `id`.
    pub(crate) fn route(&self, id: VarId, command: Command) -> KahnResult<()> {
        let partition = self.inner.routing.route(&id) as usize;
        self.send_to(partition, command)
    }

    fn send_to(&self, partition: usize, command: Command) -> KahnResult<()> {
        let mailbox = self.inner.mailboxes.get(partition).ok_or_else(|| {
            KahnError::routing_unavailable(format!("no partition {partition}"))
        })?;
        mailbox.send(command).map_err(|_| {
            KahnError::routing_unavailable(format!("partition {partition} mailbox closed"))
        })
    }

    async fn recv<T>(rx: oneshot::Receiver<KahnResult<T>>) -> KahnResult<T> {
        rx.await
            .map_err(|_| KahnError::routing_unavailable("reply channel closed"))?
    }

    /// Declare a variable, allocating a fresh id when none is given.
    pub async fn declare(
        &self,
        id: Option<VarId>,
        type_tag: Option<TypeTag>,
    ) -> KahnResult<VarId> {
        let id = id.unwrap_or_else(VarId::fresh);
        let (tx, rx) = oneshot::channel();
        self.route(
            id,
            Command::Declare {
                id,
                type_tag,
                reply: tx,
            },
        )?;
        Self::recv(rx).await
    }

    /// Bind a concrete value; returns the stream successor.
    pub async fn bind(&self, id: VarId, value: Datum) -> KahnResult<BindOutcome> {
        let (tx, rx) = oneshot::channel();
        self.route(
            id,
            Command::Bind {
                id,
                payload: BindPayload::Value(value),
                reply: tx,
            },
        )?;
        Self::recv(rx).await
    }

    /// Bind a variable to another variable's identifier.
    ///
    /// Resolves once the fetch protocol links or copies the target cell;
    /// the target's value then propagates to `id` when the target binds.
    pub async fn bind_to(&self, id: VarId, target: VarId) -> KahnResult<BindOutcome> {
        let (tx, rx) = oneshot::channel();
        self.route(
            id,
            Command::Bind {
                id,
                payload: BindPayload::Alias(target),
                reply: tx,
            },
        )?;
        Self::recv(rx).await
    }

    /// Read a variable, suspending until it is bound.
    pub async fn read(&self, id: VarId) -> KahnResult<ReadReply> {
        self.read_keyed(id, None, self.waiter_key()).await
    }

    /// Read a lattice variable at a threshold observation point,
    /// suspending until the value has advanced past it.
    pub async fn read_threshold(
        &self,
        id: VarId,
        threshold: Threshold,
    ) -> KahnResult<ReadReply> {
        self.read_keyed(id, Some(threshold), self.waiter_key()).await
    }

    /// Read with a caller-supplied handle key, so the suspended read can
    /// be removed with [`Coordinator::cancel`].
    pub async fn read_keyed(
        &self,
        id: VarId,
        threshold: Option<Threshold>,
        key: WaiterKey,
    ) -> KahnResult<ReadReply> {
        let (tx, rx) = oneshot::channel();
        self.route(
            id,
            Command::Read {
                id,
                threshold,
                waiter: key,
                reply: tx,
            },
        )?;
        Self::recv(rx).await
    }

    /// Remove a suspended read by its handle key. Fire-and-forget.
    pub fn cancel(&self, id: VarId, key: WaiterKey) {
        let _ = self.route(id, Command::Cancel { id, waiter: key });
    }

    /// Whether the variable has been assigned. Never blocks.
    pub async fn is_det(&self, id: VarId) -> KahnResult<bool> {
        let (tx, rx) = oneshot::channel();
        self.route(id, Command::IsDet { id, reply: tx })?;
        Self::recv(rx).await
    }

    /// Return the stream successor, allocating it on first use.
    pub async fn next(&self, id: VarId) -> KahnResult<VarId> {
        let (tx, rx) = oneshot::channel();
        self.route(id, Command::Next { id, reply: tx })?;
        Self::recv(rx).await
    }

    /// Park until demand for the variable arrives.
    pub async fn wait_needed(&self, id: VarId) -> KahnResult<()> {
        let (tx, rx) = oneshot::channel();
        self.route(id, Command::WaitNeeded { id, reply: tx })?;
        Self::recv(rx).await
    }

    /// Spawn a named user computation, fire-and-forget.
    ///
    /// Placement hashes the `(module, function, args)` tuple, so repeated
    /// spawns of the same call land on the same partition.
    pub async fn thread(
        &self,
        module: impl Into<String>,
        function: impl Into<String>,
        args: Vec<Datum>,
    ) -> KahnResult<ThreadId> {
        let module = module.into();
        let function = function.into();
        let args_bytes = bincode::serialize(&args)?;
        let partition = self.inner.routing.route_bytes(&[
            module.as_bytes(),
            function.as_bytes(),
            args_bytes.as_slice(),
        ]) as usize;

        let (tx, rx) = oneshot::channel();
        self.send_to(
            partition,
            Command::Thread {
                module,
                function,
                args,
                reply: tx,
            },
        )?;
        Self::recv(rx).await
    }

    /// Encode one partition's cells for handoff.
    pub async fn export_partition(&self, partition: u32) -> KahnResult<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.send_to(partition as usize, Command::Export { reply: tx })?;
        Self::recv(rx).await
    }

    /// Merge a handoff payload into one partition, insert-if-absent.
    pub async fn import_partition(&self, partition: u32, bytes: Vec<u8>) -> KahnResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.send_to(partition as usize, Command::Import { bytes, reply: tx })?;
        Self::recv(rx).await
    }

    /// Collect store statistics from every partition.
    pub async fn stats(&self) -> KahnResult<Vec<StoreStats>> {
        let mut all = Vec::with_capacity(self.inner.mailboxes.len());
        for partition in 0..self.inner.mailboxes.len() {
            let (tx, rx) = oneshot::channel();
            self.send_to(partition, Command::Stats { reply: tx })?;
            let stats = rx
                .await
                .map_err(|_| KahnError::routing_unavailable("reply channel closed"))?;
            all.push(stats);
        }
        Ok(all)
    }
}
