//! Append-only operation log.
//!
//! Holds every operation a replica has created or integrated, in
//! integration order. Because an operation is only integrated after all of
//! its dependencies, integration order is a valid causal (topological)
//! order, which is what delta computation relies on.

use crate::{Error, Operation, Result, StateVector};
use concord_types::{OperationId, SharedId};
use std::collections::HashMap;

/// Append-only store of operations indexed by id and by target.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    /// All operations in integration order.
    ops: Vec<Operation>,
    /// Position of each operation in `ops`.
    by_id: HashMap<OperationId, usize>,
    /// Positions of the operations targeting each shared type.
    by_target: HashMap<SharedId, Vec<usize>>,
}

impl OperationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of operations in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Appends an operation.
    ///
    /// Fails if an operation with the same id is already present; the log
    /// never holds two operations with one id.
    pub fn append(&mut self, op: Operation) -> Result<()> {
        if self.by_id.contains_key(&op.id) {
            return Err(Error::DuplicateOperation(op.id));
        }
        let pos = self.ops.len();
        self.by_id.insert(op.id, pos);
        self.by_target.entry(op.target).or_default().push(pos);
        self.ops.push(op);
        Ok(())
    }

    /// Returns true if the log holds an operation with this id.
    #[must_use]
    pub fn contains(&self, id: &OperationId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Looks up an operation by id.
    #[must_use]
    pub fn get(&self, id: &OperationId) -> Option<&Operation> {
        self.by_id.get(id).map(|&pos| &self.ops[pos])
    }

    /// Returns all operations in integration order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.ops.iter()
    }

    /// Returns the operations targeting a shared type, in integration order.
    pub fn for_target(&self, target: &SharedId) -> impl Iterator<Item = &Operation> {
        self.by_target
            .get(target)
            .into_iter()
            .flatten()
            .map(|&pos| &self.ops[pos])
    }

    /// Returns the operations not covered by `peer`, in causal order.
    ///
    /// This is exactly what a peer with state vector `peer` is missing.
    #[must_use]
    pub fn delta(&self, peer: &StateVector) -> Vec<Operation> {
        self.ops
            .iter()
            .filter(|op| !peer.covers(&op.id))
            .cloned()
            .collect()
    }
}
