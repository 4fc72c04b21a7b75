//! State vectors for causality tracking.
//!
//! A state vector records, per replica, the highest operation clock observed
//! from that replica. Operations from one replica are integrated in clock
//! order, so "highest observed" implies "every lower clock observed" and a
//! state vector describes a set of operations exactly.
//!
//! Use cases:
//! - Causal dependencies of an operation (the author's vector at creation)
//! - Happens-before tests between operations
//! - Sync protocol (computing the delta a peer is missing)

use concord_types::{OperationId, ReplicaId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Causality relationship between two state vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// First vector happened before second.
    Before,
    /// First vector happened after second.
    After,
    /// Vectors are concurrent (neither happened before the other).
    Concurrent,
    /// Vectors are identical.
    Equal,
}

/// Map from replica to the highest contiguous clock observed from it.
///
/// Entries are kept sorted so the serialized form is stable across replicas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVector {
    clocks: BTreeMap<ReplicaId, u64>,
}

impl StateVector {
    /// Creates a new empty state vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clocks: BTreeMap::new(),
        }
    }

    /// Returns the highest clock observed from a replica (0 if none).
    #[must_use]
    pub fn get(&self, replica: &ReplicaId) -> u64 {
        self.clocks.get(replica).copied().unwrap_or(0)
    }

    /// Returns all replicas and their clocks.
    pub fn replicas(&self) -> impl Iterator<Item = (&ReplicaId, &u64)> {
        self.clocks.iter()
    }

    /// Returns the number of replicas in the vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Returns true if nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Returns true if the operation is part of the history this vector
    /// describes.
    #[must_use]
    pub fn covers(&self, id: &OperationId) -> bool {
        self.get(&id.replica) >= id.clock
    }

    /// Records an observed operation.
    ///
    /// Only moves forward; observing an already covered id is a no-op.
    pub fn observe(&mut self, id: OperationId) {
        let entry = self.clocks.entry(id.replica).or_insert(0);
        if id.clock > *entry {
            *entry = id.clock;
        }
    }

    /// Merges another vector into this one.
    ///
    /// For each replica, takes the maximum of the two clocks.
    /// This operation is commutative, associative, and idempotent.
    pub fn merge(&mut self, other: &Self) {
        for (replica, &clock) in &other.clocks {
            let entry = self.clocks.entry(*replica).or_insert(0);
            if clock > *entry {
                *entry = clock;
            }
        }
    }

    /// Creates a new vector that is the merge of this and another.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Compares this vector with another to determine causal ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut self_ge = true;
        let mut other_ge = true;

        let all: HashSet<_> = self.clocks.keys().chain(other.clocks.keys()).collect();

        for replica in all {
            let mine = self.get(replica);
            let theirs = other.get(replica);

            if mine < theirs {
                self_ge = false;
            }
            if theirs < mine {
                other_ge = false;
            }
        }

        match (self_ge, other_ge) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::After,
            (false, true) => CausalOrder::Before,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// Returns true if this vector has seen everything the other has.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        matches!(self.compare(other), CausalOrder::After | CausalOrder::Equal)
    }

    /// Returns true if this vector is concurrent with the other.
    #[must_use]
    pub fn is_concurrent(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }
}

impl PartialEq for StateVector {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Equal
    }
}

impl Eq for StateVector {}

impl FromIterator<OperationId> for StateVector {
    fn from_iter<I: IntoIterator<Item = OperationId>>(iter: I) -> Self {
        let mut sv = Self::new();
        for id in iter {
            sv.observe(id);
        }
        sv
    }
}
