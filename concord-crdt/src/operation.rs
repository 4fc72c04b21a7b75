//! Operations: the unit of replication.
//!
//! Every mutation of a shared type is recorded as an immutable operation.
//! An operation carries everything a remote replica needs to integrate it:
//! its id, the shared type it targets, what it does, and the author's state
//! vector at the time it was created (its causal dependencies).

use crate::StateVector;
use concord_types::{Content, OperationId, ReplicaId, SharedId};
use serde::{Deserialize, Serialize};

/// What an operation does to its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum OpKind {
    /// Write a value under a map key.
    Set {
        /// The key being written.
        key: String,
        /// The value (or nested-type request) being written.
        content: Content,
    },

    /// Delete a map key.
    Delete {
        /// The key being deleted.
        key: String,
    },

    /// Insert one element into a sequence.
    Insert {
        /// The element this one was inserted after (`None` = head).
        origin: Option<OperationId>,
        /// Sibling precedence: one more than the largest rank the author
        /// had seen in the sequence.
        rank: u64,
        /// The element's content.
        content: Content,
    },

    /// Tombstone one element of a sequence.
    Remove {
        /// The element being removed.
        element: OperationId,
    },
}

impl OpKind {
    /// Returns the map key this operation touches, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => Some(key),
            Self::Insert { .. } | Self::Remove { .. } => None,
        }
    }

    /// Returns the content written, if any.
    #[must_use]
    pub fn content(&self) -> Option<&Content> {
        match self {
            Self::Set { content, .. } | Self::Insert { content, .. } => Some(content),
            Self::Delete { .. } | Self::Remove { .. } => None,
        }
    }

    /// Returns true for operations that target maps.
    #[must_use]
    pub fn is_map_op(&self) -> bool {
        matches!(self, Self::Set { .. } | Self::Delete { .. })
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Delete { .. } => "delete",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
        }
    }
}

/// An immutable record of one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier for this operation.
    pub id: OperationId,

    /// The shared type this operation applies to.
    pub target: SharedId,

    /// The mutation.
    pub kind: OpKind,

    /// Everything the author had observed before creating this operation.
    #[serde(default)]
    pub deps: StateVector,
}

impl Operation {
    /// Creates a new operation.
    #[must_use]
    pub fn new(id: OperationId, target: SharedId, kind: OpKind, deps: StateVector) -> Self {
        Self {
            id,
            target,
            kind,
            deps,
        }
    }

    /// Returns the authoring replica.
    #[must_use]
    pub fn replica(&self) -> ReplicaId {
        self.id.replica
    }

    /// Returns true if `other` happened before this operation.
    #[must_use]
    pub fn depends_on(&self, other: &OperationId) -> bool {
        self.deps.covers(other)
    }

    /// Returns true if this operation happened before `other`.
    #[must_use]
    pub fn happens_before(&self, other: &Operation) -> bool {
        other.depends_on(&self.id)
    }

    /// Returns true if neither operation happened before the other.
    #[must_use]
    pub fn is_concurrent_with(&self, other: &Operation) -> bool {
        !self.happens_before(other) && !other.happens_before(self)
    }

    /// Returns the operations that must be integrated before this one,
    /// expressed as the author's state vector plus the author's previous
    /// operation.
    #[must_use]
    pub fn required(&self) -> StateVector {
        let mut required = self.deps.clone();
        if self.id.clock > 1 {
            required.observe(OperationId::new(self.id.replica, self.id.clock - 1));
        }
        required
    }
}
