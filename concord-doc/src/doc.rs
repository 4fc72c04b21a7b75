//! The replica: one independent copy of a shared document.
//!
//! A [`Doc`] owns everything a replica needs: its logical clock, state
//! vector, operation log, the shared types themselves, the buffer of
//! received operations waiting for their dependencies, the outbox of
//! locally created operations, and the observers. Nothing is global, so
//! any number of replicas can live in one process.
//!
//! Local and remote operations go through the same integration path. Each
//! local mutation call and each integrated remote operation is one
//! transaction; its events are delivered to observers before the call
//! returns.

use crate::array::{ArrayMut, ArrayView};
use crate::config::DocConfig;
use crate::error::{DocError, DocResult};
use crate::event::TypeEvent;
use crate::map::{MapMut, MapView};
use crate::observer::{ObserverId, ObserverRegistry};
use crate::shared::{MapState, SharedType};
use crate::transaction::Transaction;
use concord_crdt::{OpKind, Operation, OperationLog, Sequence, StateVector};
use concord_types::{Content, LocalClock, OperationId, ReplicaId, SharedId, SharedRef, TypeKind, Value};
use std::collections::HashMap;
use tracing::{debug, error};

/// What happened to a batch of received operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Operations integrated (including previously held ones released now).
    pub applied: usize,
    /// Operations that were already known and skipped.
    pub duplicates: usize,
    /// Operations still waiting for missing dependencies.
    pub pending: usize,
}

/// One replica of a shared document.
pub struct Doc {
    /// Mints ids for local operations.
    clock: LocalClock,
    /// Configuration.
    config: DocConfig,
    /// Everything integrated so far.
    state: StateVector,
    /// Every integrated operation, in integration order.
    log: OperationLog,
    /// Shared type instances, including orphaned ones.
    types: HashMap<SharedId, SharedType>,
    /// Received operations whose dependencies are missing.
    pending: Vec<Operation>,
    /// Local operations not yet handed to the transport. Grows until
    /// `take_outbox` is called.
    outbox: Vec<Operation>,
    /// Registered observers.
    observers: ObserverRegistry,
    /// Set once an identity collision has been detected.
    poisoned: Option<OperationId>,
}

impl Doc {
    /// Creates an empty document replica with the default configuration.
    #[must_use]
    pub fn new(replica: ReplicaId) -> Self {
        Self::with_config(replica, DocConfig::default())
    }

    /// Creates an empty document replica.
    #[must_use]
    pub fn with_config(replica: ReplicaId, config: DocConfig) -> Self {
        let mut types = HashMap::new();
        types.insert(SharedId::Root, SharedType::new(TypeKind::Map));
        Self {
            clock: LocalClock::new(replica),
            config,
            state: StateVector::new(),
            log: OperationLog::new(),
            types,
            pending: Vec::new(),
            outbox: Vec::new(),
            observers: ObserverRegistry::default(),
            poisoned: None,
        }
    }

    /// Returns this replica's id.
    #[must_use]
    pub fn replica_id(&self) -> ReplicaId {
        self.clock.replica()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DocConfig {
        &self.config
    }

    /// Returns the clock of the last locally created operation.
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock.current()
    }

    /// Returns the state vector of everything integrated so far.
    #[must_use]
    pub fn state_vector(&self) -> &StateVector {
        &self.state
    }

    /// Returns true if the operation has been integrated.
    #[must_use]
    pub fn is_known(&self, id: &OperationId) -> bool {
        self.state.covers(id)
    }

    /// Returns the operation log.
    #[must_use]
    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    /// Returns the operations a peer with state vector `peer` is missing,
    /// dependencies first.
    #[must_use]
    pub fn delta(&self, peer: &StateVector) -> Vec<Operation> {
        self.log.delta(peer)
    }

    /// Takes the operations created locally since the last call, for
    /// broadcasting.
    ///
    /// The outbox is only emptied here. Hosts that sync through
    /// [`Doc::delta`] instead should still call this periodically and drop
    /// the result, otherwise the outbox keeps every local operation.
    pub fn take_outbox(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.outbox)
    }

    /// Returns true if local operations are waiting to be broadcast.
    #[must_use]
    pub fn has_outgoing(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Returns the number of received operations waiting for dependencies.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if an identity collision stopped this replica.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Returns how many observer invocations have failed.
    #[must_use]
    pub fn observer_failures(&self) -> u64 {
        self.observers.failures()
    }

    // ── Shared type access ───────────────────────────────────────

    /// Returns the root map for reading and writing.
    pub fn root(&mut self) -> MapMut<'_> {
        MapMut::new(self, SharedId::Root)
    }

    /// Returns the root map for reading.
    #[must_use]
    pub fn read_root(&self) -> MapView<'_> {
        MapView::new(self, SharedId::Root)
    }

    /// Returns a map for reading and writing.
    pub fn map(&mut self, shared: SharedRef) -> DocResult<MapMut<'_>> {
        self.check_kind(&shared.id, TypeKind::Map)?;
        Ok(MapMut::new(self, shared.id))
    }

    /// Returns a map for reading.
    pub fn read_map(&self, shared: SharedRef) -> DocResult<MapView<'_>> {
        self.check_kind(&shared.id, TypeKind::Map)?;
        Ok(MapView::new(self, shared.id))
    }

    /// Returns an array for reading and writing.
    pub fn array(&mut self, shared: SharedRef) -> DocResult<ArrayMut<'_>> {
        self.check_kind(&shared.id, TypeKind::Array)?;
        Ok(ArrayMut::new(self, shared.id))
    }

    /// Returns an array for reading.
    pub fn read_array(&self, shared: SharedRef) -> DocResult<ArrayView<'_>> {
        self.check_kind(&shared.id, TypeKind::Array)?;
        Ok(ArrayView::new(self, shared.id))
    }

    /// Returns true if a shared type with this id exists on this replica.
    #[must_use]
    pub fn contains_type(&self, id: &SharedId) -> bool {
        self.types.contains_key(id)
    }

    /// Registers an observer for a shared type.
    pub fn observe<F>(&mut self, shared: SharedRef, callback: F) -> DocResult<ObserverId>
    where
        F: FnMut(&TypeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.check_kind(&shared.id, shared.kind)?;
        Ok(self.observers.register(shared.id, Box::new(callback)))
    }

    /// Unregisters an observer. Returns false if it was not registered.
    pub fn unobserve(&mut self, shared: SharedRef, id: ObserverId) -> bool {
        self.observers.unregister(&shared.id, id)
    }

    /// Returns the number of observers registered for a shared type.
    #[must_use]
    pub fn observer_count(&self, shared: SharedRef) -> usize {
        self.observers.count(&shared.id)
    }

    /// Renders the whole visible document as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.render(&SharedId::Root)
    }

    // ── Remote operations ────────────────────────────────────────

    /// Integrates operations received from other replicas.
    ///
    /// Known operations are skipped. Operations whose dependencies are
    /// missing are held and integrated as soon as the dependencies arrive.
    /// Receiving an operation that reuses a known id with different content
    /// poisons the replica.
    pub fn receive(
        &mut self,
        ops: impl IntoIterator<Item = Operation>,
    ) -> DocResult<ReceiveSummary> {
        self.ensure_healthy()?;
        let mut summary = ReceiveSummary::default();
        for op in ops {
            if let Err(err) = self.receive_one(op, &mut summary) {
                if matches!(err, DocError::PendingOverflow { .. }) {
                    self.drain_pending(&mut summary)?;
                }
                return Err(err);
            }
        }
        self.drain_pending(&mut summary)?;
        Ok(summary)
    }

    fn receive_one(&mut self, op: Operation, summary: &mut ReceiveSummary) -> DocResult<()> {
        if self.state.covers(&op.id) {
            let same = self.log.get(&op.id).is_some_and(|known| *known == op);
            if !same {
                return Err(self.poison(op.id));
            }
            summary.duplicates += 1;
            return Ok(());
        }
        if op.id.replica == self.replica_id() {
            return Err(self.poison(op.id));
        }
        if let Some(same) = self.pending.iter().find(|p| p.id == op.id).map(|p| *p == op) {
            if !same {
                return Err(self.poison(op.id));
            }
            summary.duplicates += 1;
            return Ok(());
        }

        if self.is_ready(&op) {
            self.apply_remote(op)?;
            summary.applied += 1;
            // Held operations may have been waiting on this one.
            self.drain_pending(summary)?;
        } else {
            if self.pending.len() >= self.config.max_pending {
                return Err(DocError::PendingOverflow {
                    limit: self.config.max_pending,
                });
            }
            debug!(id = %op.id, "holding operation until its dependencies arrive");
            self.pending.push(op);
        }
        Ok(())
    }

    fn drain_pending(&mut self, summary: &mut ReceiveSummary) -> DocResult<()> {
        while let Some(pos) = self.pending.iter().position(|op| self.is_ready(op)) {
            let op = self.pending.remove(pos);
            debug!(id = %op.id, "releasing held operation");
            self.apply_remote(op)?;
            summary.applied += 1;
        }
        summary.pending = self.pending.len();
        Ok(())
    }

    fn is_ready(&self, op: &Operation) -> bool {
        self.state.get(&op.id.replica) + 1 == op.id.clock
            && self.state.dominates(&op.deps)
            && self.types.contains_key(&op.target)
    }

    fn apply_remote(&mut self, op: Operation) -> DocResult<()> {
        let mut txn = Transaction::new();
        let result = self.integrate(op, &mut txn);
        self.commit(txn);
        result
    }

    // ── Local operations ─────────────────────────────────────────

    /// Runs `f` as one transaction and delivers the resulting events.
    pub(crate) fn transact<R>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut Transaction) -> DocResult<R>,
    ) -> DocResult<R> {
        self.ensure_healthy()?;
        let mut txn = Transaction::new();
        let result = f(self, &mut txn);
        self.commit(txn);
        result
    }

    /// Creates, integrates and queues a local operation.
    pub(crate) fn create_local(
        &mut self,
        txn: &mut Transaction,
        target: SharedId,
        kind: OpKind,
    ) -> DocResult<Operation> {
        let expected = if kind.is_map_op() {
            TypeKind::Map
        } else {
            TypeKind::Array
        };
        self.check_kind(&target, expected)?;

        let deps = self.state.clone();
        let id = self.clock.next_id();
        let op = Operation::new(id, target, kind, deps);
        self.integrate(op.clone(), txn)?;
        self.outbox.push(op.clone());
        Ok(op)
    }

    // ── Integration ──────────────────────────────────────────────

    fn integrate(&mut self, op: Operation, txn: &mut Transaction) -> DocResult<()> {
        debug!(
            id = %op.id,
            target = %op.target,
            op = op.kind.name(),
            replica = %self.replica_id(),
            "integrating operation"
        );
        let target = op.target;
        let shared = self
            .types
            .get_mut(&target)
            .ok_or(DocError::UnknownType(target))?;

        match (&op.kind, shared) {
            (OpKind::Set { key, content }, SharedType::Map(map)) => {
                txn.touch_key(target, key, map.resolve(key));
                map.slots
                    .entry(key.clone())
                    .or_default()
                    .apply_set(op.clone(), content.clone());
            }
            (OpKind::Delete { key }, SharedType::Map(map)) => {
                txn.touch_key(target, key, map.resolve(key));
                map.slots
                    .entry(key.clone())
                    .or_default()
                    .apply_delete(op.clone());
            }
            (
                OpKind::Insert {
                    origin,
                    rank,
                    content,
                },
                SharedType::Array(seq),
            ) => {
                let index = seq.insert(op.id, *origin, *rank, content.clone())?;
                txn.record_insert(target, index, Value::from_content(content, op.id));
            }
            (OpKind::Remove { element }, SharedType::Array(seq)) => {
                if let Some((index, content)) = seq.remove(element)? {
                    txn.record_remove(target, index, Value::from_content(&content, *element));
                }
            }
            (kind, shared) => {
                return Err(DocError::WrongType {
                    id: target,
                    expected: if kind.is_map_op() {
                        TypeKind::Map
                    } else {
                        TypeKind::Array
                    },
                    actual: shared.kind(),
                });
            }
        }

        // Nested types exist from the moment their creating operation
        // integrates, whether or not it ends up visible.
        if let Some(kind) = op.kind.content().and_then(Content::type_kind) {
            self.types
                .entry(SharedId::Nested(op.id))
                .or_insert_with(|| SharedType::new(kind));
        }

        self.state.observe(op.id);
        self.log.append(op)?;
        Ok(())
    }

    fn commit(&mut self, txn: Transaction) {
        let types = &self.types;
        let events = txn.into_events(|id, key| match types.get(id) {
            Some(SharedType::Map(map)) => map.resolve(key),
            _ => None,
        });
        if !events.is_empty() {
            self.observers
                .dispatch(&events, self.config.isolate_observer_panics);
        }
    }

    fn ensure_healthy(&self) -> DocResult<()> {
        match self.poisoned {
            Some(id) => Err(DocError::Poisoned { id }),
            None => Ok(()),
        }
    }

    fn poison(&mut self, id: OperationId) -> DocError {
        error!(
            %id,
            replica = %self.replica_id(),
            "identity collision, refusing further integration"
        );
        self.poisoned = Some(id);
        DocError::IdentityCollision { id }
    }

    // ── Internal accessors ───────────────────────────────────────

    pub(crate) fn check_kind(&self, id: &SharedId, expected: TypeKind) -> DocResult<()> {
        let shared = self.types.get(id).ok_or(DocError::UnknownType(*id))?;
        let actual = shared.kind();
        if actual != expected {
            return Err(DocError::WrongType {
                id: *id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub(crate) fn map_state(&self, id: &SharedId) -> Option<&MapState> {
        match self.types.get(id)? {
            SharedType::Map(map) => Some(map),
            SharedType::Array(_) => None,
        }
    }

    pub(crate) fn sequence(&self, id: &SharedId) -> Option<&Sequence> {
        match self.types.get(id)? {
            SharedType::Array(seq) => Some(seq),
            SharedType::Map(_) => None,
        }
    }

    pub(crate) fn render(&self, id: &SharedId) -> serde_json::Value {
        match self.types.get(id) {
            Some(SharedType::Map(map)) => serde_json::Value::Object(
                map.visible()
                    .map(|(key, value)| (key.clone(), self.render_value(&value)))
                    .collect(),
            ),
            Some(SharedType::Array(seq)) => serde_json::Value::Array(
                seq.iter()
                    .map(|e| self.render_value(&Value::from_content(&e.content, e.id)))
                    .collect(),
            ),
            None => serde_json::Value::Null,
        }
    }

    pub(crate) fn render_value(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Primitive(v) => v.clone(),
            Value::Shared(shared) => self.render(&shared.id),
        }
    }
}

impl std::fmt::Debug for Doc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Doc")
            .field("replica", &self.replica_id())
            .field("clock", &self.clock.current())
            .field("state", &self.state)
            .field("log_len", &self.log.len())
            .field("types", &self.types.len())
            .field("pending", &self.pending.len())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
