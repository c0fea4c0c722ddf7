//! Core executor: the operations over one partition's store.
//!
//! Every operation runs on the partition owning the target id and operates
//! atomically on a single cell. Suspension never blocks the executor: a
//! read or `wait_needed` that cannot complete parks the caller's reply
//! slot in the cell and returns. Binds wake ready waiters, notify bound
//! aliases, and allocate stream successors; all of it surfaces as
//! [`Effects`] for the partition task to perform.

use crate::core::error::{KahnError, KahnResult};
use crate::exec::effects::{Effects, Outbound, Reply};
use crate::lattice::registry::{LatticeRegistry, Threshold};
use crate::store::cell::{Cell, CellSnapshot};
use crate::store::id::VarId;
use crate::store::value::{Datum, TypeTag, Value};
use crate::store::var_store::VarStore;
use crate::store::waiters::{
    AckSlot, BindOutcome, BindSlot, ReadReply, ReadSlot, Waiter, WaiterKey, WaiterKind,
};
use std::sync::Arc;

/// Payload of a bind: a concrete value or another variable's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindPayload {
    /// Bind a concrete value.
    Value(Datum),
    /// Bind this cell to another variable; the target's value propagates
    /// back through the fetch protocol.
    Alias(VarId),
}

/// Executor over a partition-local store.
pub struct Executor {
    registry: Arc<LatticeRegistry>,
}

impl Executor {
    /// Create an executor backed by a lattice registry.
    pub fn new(registry: Arc<LatticeRegistry>) -> Self {
        Self { registry }
    }

    /// The lattice registry.
    pub fn registry(&self) -> &LatticeRegistry {
        &self.registry
    }

    fn new_cell(&self, type_tag: Option<TypeTag>) -> Cell {
        match &type_tag {
            Some(tag) if self.registry.is_lattice(tag) => {
                let bottom = self.registry.bottom(tag).unwrap_or(Datum::Nil);
                Cell::lattice(tag.clone(), bottom)
            }
            _ => Cell::unbound(type_tag),
        }
    }

    fn lattice_tag(&self, cell: &Cell) -> Option<TypeTag> {
        cell.type_tag
            .clone()
            .filter(|tag| self.registry.is_lattice(tag))
    }

    /// Create the cell for an id, insert-if-absent.
    ///
    /// Re-declaring an existing id with the same type tag is idempotent;
    /// a differing tag is a conflict.
    pub fn declare(
        &self,
        store: &mut VarStore,
        id: Option<VarId>,
        type_tag: Option<TypeTag>,
    ) -> KahnResult<VarId> {
        let id = id.unwrap_or_else(VarId::fresh);
        match store.get(&id) {
            Some(existing) if existing.type_tag == type_tag => Ok(id),
            Some(_) => Err(KahnError::DeclareConflict { id }),
            None => {
                store.insert_if_absent(id, self.new_cell(type_tag));
                Ok(id)
            }
        }
    }

    /// Apply a successor declaration routed from another partition.
    ///
    /// Unlike user-facing declare, this heals the race where a fetch
    /// reached the id first and implicitly created an untyped cell: the
    /// tag is adopted, and a lattice tag binds the cell at bottom, waking
    /// any plain waiters that arrived early.
    pub fn declare_remote(
        &self,
        store: &mut VarStore,
        id: VarId,
        type_tag: Option<TypeTag>,
    ) -> Effects {
        let mut fx = Effects::new();
        if !store.contains(&id) {
            store.insert_if_absent(id, self.new_cell(type_tag));
            return fx;
        }
        let Some(cell) = store.get_mut(&id) else {
            return fx;
        };

        if cell.type_tag.is_none() && !cell.is_bound() {
            if let Some(tag) = type_tag {
                cell.type_tag = Some(tag.clone());
                if let Some(bottom) = self.registry.bottom(&tag) {
                    cell.value = Value::Concrete(bottom.clone());
                    cell.set_bound();
                    let next = cell.next;
                    for waiter in cell.waiters.split_ready(|_| false) {
                        fx.reply(Reply::Read {
                            slot: waiter.slot,
                            result: Ok(ReadReply {
                                value: bottom.clone(),
                                next,
                            }),
                        });
                    }
                }
            }
        } else if cell.type_tag != type_tag {
            tracing::warn!(id = %id, "successor declare ignored: cell already typed");
        }
        fx
    }

    /// Bind a value or an alias onto a cell.
    ///
    /// The caller's reply slot is answered immediately for the value case;
    /// an alias bind defers it into the fetch protocol and the answer
    /// arrives with the matching `reply_fetch`.
    pub fn bind(
        &self,
        store: &mut VarStore,
        id: VarId,
        payload: BindPayload,
        slot: BindSlot,
    ) -> Effects {
        let mut fx = Effects::new();
        match payload {
            BindPayload::Alias(target) => match store.get_mut(&id) {
                None => fx.reply(Reply::Bind {
                    slot,
                    result: Err(KahnError::UnknownVariable { id }),
                }),
                Some(cell) if cell.is_bound() || cell.value.is_alias() => {
                    fx.reply(Reply::Bind {
                        slot,
                        result: Err(KahnError::ConflictingBind { id }),
                    });
                }
                Some(cell) => {
                    cell.value = Value::Alias(target);
                    tracing::debug!(from = %id, target = %target, "alias bind, fetching target");
                    fx.send(Outbound::Fetch {
                        target,
                        from: id,
                        reply: slot,
                    });
                }
            },
            BindPayload::Value(datum) => {
                let result = self
                    .write_value(store, id, datum, None, None, &mut fx)
                    .map(|next| BindOutcome { next });
                fx.reply(Reply::Bind { slot, result });
            }
        }
        fx
    }

    /// Write a concrete value into a cell: the shared path behind a value
    /// bind, an alias notification, and a bound fetch snapshot.
    ///
    /// Returns the cell's successor after the write. `next_override` and
    /// `tag_override` carry a bound snapshot's fields on the alias path.
    fn write_value(
        &self,
        store: &mut VarStore,
        id: VarId,
        datum: Datum,
        next_override: Option<VarId>,
        tag_override: Option<TypeTag>,
        fx: &mut Effects,
    ) -> KahnResult<Option<VarId>> {
        let Some(cell) = store.get_mut(&id) else {
            return Err(KahnError::UnknownVariable { id });
        };

        if let Some(tag) = self.lattice_tag(cell) {
            // Lattice progression: the incoming value is a join input and
            // every bind advances the stream with a fresh successor.
            let current = cell
                .concrete_value()
                .cloned()
                .or_else(|| self.registry.bottom(&tag))
                .unwrap_or(Datum::Nil);
            let joined = self
                .registry
                .join(&tag, &current, &datum)
                .unwrap_or(datum);
            cell.value = Value::Concrete(joined.clone());

            let next = VarId::fresh();
            cell.next = Some(next);
            fx.send(Outbound::Declare {
                id: next,
                type_tag: Some(tag.clone()),
            });

            let ready = cell
                .waiters
                .split_ready(|t| self.registry.threshold_met(&tag, &joined, t));
            for waiter in ready {
                fx.reply(Reply::Read {
                    slot: waiter.slot,
                    result: Ok(ReadReply {
                        value: joined.clone(),
                        next: Some(next),
                    }),
                });
            }

            // Lattice cells keep their alias list: every advance fans out.
            for alias in &cell.aliases {
                fx.send(Outbound::NotifyValue {
                    id: *alias,
                    value: joined.clone(),
                });
            }

            return Ok(Some(next));
        }

        if cell.is_bound() {
            // Idempotent rebind with the same value; anything else fails.
            return match cell.concrete_value() {
                Some(existing) if *existing == datum => Ok(cell.next),
                _ => Err(KahnError::ConflictingBind { id }),
            };
        }

        if let Some(tag) = tag_override {
            cell.type_tag = Some(tag);
        }
        if let Some(next) = next_override {
            cell.next = Some(next);
        } else if cell.next.is_none() && !datum.is_nil() {
            let next = VarId::fresh();
            cell.next = Some(next);
            fx.send(Outbound::Declare {
                id: next,
                type_tag: cell.type_tag.clone(),
            });
        }

        cell.value = Value::Concrete(datum.clone());
        cell.set_bound();

        let next = cell.next;
        for waiter in cell.waiters.split_ready(|_| false) {
            fx.reply(Reply::Read {
                slot: waiter.slot,
                result: Ok(ReadReply {
                    value: datum.clone(),
                    next,
                }),
            });
        }

        // A lazy producer still parked in wait_needed is released: the
        // cell is bound, so its demand question is already answered.
        if let Some(creator) = cell.creator.take() {
            fx.reply(Reply::Ack {
                slot: creator,
                result: Ok(()),
            });
        }

        // Single assignment: one notification per alias, then the edge
        // list is dropped.
        for alias in cell.aliases.drain(..) {
            fx.send(Outbound::NotifyValue {
                id: alias,
                value: datum.clone(),
            });
        }

        Ok(next)
    }

    /// Read a cell, optionally at a threshold observation point.
    ///
    /// An unbound cell parks the caller as a plain waiter, first waking a
    /// lazy creator so demand drives production. A bound lattice cell with
    /// an unmet threshold parks a threshold waiter.
    pub fn read(
        &self,
        store: &mut VarStore,
        id: VarId,
        threshold: Option<Threshold>,
        key: WaiterKey,
        slot: ReadSlot,
    ) -> Effects {
        let mut fx = Effects::new();
        let Some(cell) = store.get_mut(&id) else {
            fx.reply(Reply::Read {
                slot,
                result: Err(KahnError::UnknownVariable { id }),
            });
            return fx;
        };

        if !cell.is_bound() {
            if cell.is_lazy() {
                if let Some(creator) = cell.creator.take() {
                    fx.reply(Reply::Ack {
                        slot: creator,
                        result: Ok(()),
                    });
                }
            }
            cell.waiters.push(Waiter {
                key,
                kind: WaiterKind::Plain,
                slot,
            });
            return fx;
        }

        let value = cell.concrete_value().cloned().unwrap_or(Datum::Nil);
        let next = cell.next;

        match (self.lattice_tag(cell), threshold) {
            (Some(tag), Some(threshold)) => {
                if self.registry.threshold_met(&tag, &value, &threshold) {
                    fx.reply(Reply::Read {
                        slot,
                        result: Ok(ReadReply { value, next }),
                    });
                } else {
                    cell.waiters.push(Waiter {
                        key,
                        kind: WaiterKind::Threshold(threshold),
                        slot,
                    });
                }
            }
            _ => {
                fx.reply(Reply::Read {
                    slot,
                    result: Ok(ReadReply { value, next }),
                });
            }
        }
        fx
    }

    /// Whether the cell has been assigned. Never blocks.
    pub fn is_det(&self, store: &VarStore, id: VarId) -> KahnResult<bool> {
        store
            .get(&id)
            .map(|cell| cell.is_bound())
            .ok_or(KahnError::UnknownVariable { id })
    }

    /// Park a lazy producer until demand arrives.
    ///
    /// Returns immediately when the cell is bound or demand is already
    /// present (parked waiters, or a creator already recorded).
    pub fn wait_needed(&self, store: &mut VarStore, id: VarId, slot: AckSlot) -> Effects {
        let mut fx = Effects::new();
        match store.get_mut(&id) {
            None => fx.reply(Reply::Ack {
                slot,
                result: Err(KahnError::UnknownVariable { id }),
            }),
            Some(cell) => {
                if cell.is_bound() || !cell.waiters.is_empty() || cell.creator.is_some() {
                    fx.reply(Reply::Ack {
                        slot,
                        result: Ok(()),
                    });
                } else {
                    cell.set_lazy();
                    cell.creator = Some(slot);
                }
            }
        }
        fx
    }

    /// Return the stream successor, allocating and linking it on demand.
    ///
    /// The successor cell lives on the partition its id hashes to, so
    /// allocation declares it remotely. Idempotent after first success.
    pub fn next(&self, store: &mut VarStore, id: VarId) -> (KahnResult<VarId>, Effects) {
        let mut fx = Effects::new();
        let result = match store.get_mut(&id) {
            None => Err(KahnError::UnknownVariable { id }),
            Some(cell) => match cell.next {
                Some(next) => Ok(next),
                None => {
                    let next = VarId::fresh();
                    cell.next = Some(next);
                    fx.send(Outbound::Declare {
                        id: next,
                        type_tag: cell.type_tag.clone(),
                    });
                    Ok(next)
                }
            },
        };
        (result, fx)
    }

    /// Remove a parked waiter by handle key.
    pub fn cancel(&self, store: &mut VarStore, id: VarId, key: WaiterKey) -> bool {
        store
            .get_mut(&id)
            .map(|cell| cell.waiters.remove(key))
            .unwrap_or(false)
    }

    /// Handle a fetch: another cell was bound to `target`'s identifier.
    ///
    /// A bound target answers with its snapshot; an alias-valued target
    /// forwards the fetch along the chain; an unbound target links its
    /// successor, records the alias edge, and answers with its current
    /// (unbound) snapshot.
    pub fn apply_fetch(
        &self,
        store: &mut VarStore,
        target: VarId,
        from: VarId,
        reply: BindSlot,
    ) -> Effects {
        let mut fx = Effects::new();
        // A fetch can outrun the successor declare for a freshly allocated
        // id; materialize the cell rather than failing the protocol.
        let cell = store.get_or_insert_with(target, || Cell::unbound(None));

        if cell.is_bound() {
            fx.send(Outbound::ReplyFetch {
                from,
                snapshot: cell.snapshot(),
                reply,
            });
        } else if let Some(chained) = cell.value.alias_target() {
            tracing::debug!(target = %target, chained = %chained, "fetch chasing alias chain");
            fx.send(Outbound::Fetch {
                target: chained,
                from,
                reply,
            });
        } else {
            if cell.next.is_none() {
                let next = VarId::fresh();
                cell.next = Some(next);
                fx.send(Outbound::Declare {
                    id: next,
                    type_tag: cell.type_tag.clone(),
                });
            }
            cell.aliases.push(from);
            fx.send(Outbound::ReplyFetch {
                from,
                snapshot: cell.snapshot(),
                reply,
            });
        }
        fx
    }

    /// Handle a fetch reply on the cell that initiated the alias bind.
    ///
    /// A bound snapshot is written locally, waking waiters and cascading
    /// to downstream aliases; an unbound snapshot only links the shared
    /// successor. Either way the original bind caller is answered.
    pub fn apply_reply_fetch(
        &self,
        store: &mut VarStore,
        from: VarId,
        snapshot: CellSnapshot,
        reply: BindSlot,
    ) -> Effects {
        let mut fx = Effects::new();

        if snapshot.bound {
            if let Some(datum) = snapshot.value.as_concrete().cloned() {
                let result = self
                    .write_value(store, from, datum, snapshot.next, snapshot.type_tag, &mut fx)
                    .map(|next| BindOutcome { next });
                fx.reply(Reply::Bind { slot: reply, result });
                return fx;
            }
            tracing::warn!(from = %from, "bound fetch snapshot without concrete value");
        }

        match store.get_mut(&from) {
            None => fx.reply(Reply::Bind {
                slot: reply,
                result: Err(KahnError::UnknownVariable { id: from }),
            }),
            Some(cell) => {
                if cell.next.is_none() {
                    cell.next = snapshot.next;
                }
                fx.reply(Reply::Bind {
                    slot: reply,
                    result: Ok(BindOutcome { next: cell.next }),
                });
            }
        }
        fx
    }

    /// Handle a value notification for an alias of a newly bound cell.
    ///
    /// Performs a local write, which wakes this cell's waiters and notifies
    /// its own downstream aliases in turn. Delivery is at-least-once:
    /// duplicates are absorbed by the join on lattice cells and by the
    /// idempotent rebind rule elsewhere; a genuinely conflicting value is
    /// logged and dropped, since no caller is attached to this path.
    pub fn apply_notify(&self, store: &mut VarStore, id: VarId, value: Datum) -> Effects {
        let mut fx = Effects::new();
        if let Err(error) = self.write_value(store, id, value, None, None, &mut fx) {
            tracing::warn!(id = %id, %error, "alias notification discarded");
        }
        fx
    }
}
