//! Multi-value register backing one map key.
//!
//! A slot keeps every Set operation that has not been superseded (the live
//! candidates) plus every Delete ever applied to the key (tombstones).
//! Conflicts are resolved at read time:
//!
//! - A Set supersedes every candidate it causally follows.
//! - A Delete discards every candidate that does not causally follow it,
//!   so a Delete concurrent with a Set always wins.
//! - Among the remaining concurrent candidates the one with the smallest
//!   [`OperationId`] is visible.
//!
//! Discarding is monotone (a discarded Set never comes back), so the live
//! set after integrating a collection of operations does not depend on the
//! order in which they arrived.

use crate::Operation;
use concord_types::{Content, OperationId};
use std::collections::BTreeMap;
use tracing::trace;

/// A live Set candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The Set operation.
    pub op: Operation,
    /// What it wrote.
    pub content: Content,
}

/// A retained Delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Tombstone {
    /// The Delete operation.
    pub op: Operation,
}

/// Outcome of integrating an operation into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// The Set became a live candidate.
    Added,
    /// The Set was already superseded and was dropped.
    Superseded,
    /// The Delete was recorded (and possibly discarded candidates).
    Deleted,
}

/// The state of one map key.
#[derive(Debug, Clone, Default)]
pub struct Slot {
    /// Live Set candidates, keyed (and therefore sorted) by id.
    candidates: BTreeMap<OperationId, Candidate>,
    /// Every Delete applied to this key.
    tombstones: Vec<Tombstone>,
}

impl Slot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrates a Set operation.
    pub fn apply_set(&mut self, op: Operation, content: Content) -> SlotOutcome {
        // Superseded by a candidate that causally follows it.
        if self.candidates.values().any(|c| op.happens_before(&c.op)) {
            trace!(id = %op.id, "set superseded by a later candidate");
            return SlotOutcome::Superseded;
        }
        // Killed by any delete it did not observe.
        if self.tombstones.iter().any(|t| !t.op.happens_before(&op)) {
            trace!(id = %op.id, "set shadowed by an unobserved delete");
            return SlotOutcome::Superseded;
        }

        self.candidates.retain(|_, c| !c.op.happens_before(&op));
        self.candidates.insert(op.id, Candidate { op, content });
        SlotOutcome::Added
    }

    /// Integrates a Delete operation.
    pub fn apply_delete(&mut self, op: Operation) -> SlotOutcome {
        let before = self.candidates.len();
        self.candidates.retain(|_, c| op.happens_before(&c.op));
        trace!(
            id = %op.id,
            discarded = before - self.candidates.len(),
            "delete recorded"
        );
        self.tombstones.push(Tombstone { op });
        SlotOutcome::Deleted
    }

    /// Returns the visible candidate: the one with the smallest id.
    #[must_use]
    pub fn resolve(&self) -> Option<&Candidate> {
        self.candidates.values().next()
    }

    /// Returns all live candidates, smallest id first.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    /// Returns the retained deletes.
    #[must_use]
    pub fn tombstones(&self) -> &[Tombstone] {
        &self.tombstones
    }

    /// Returns true if the key currently reads as absent.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.candidates.is_empty()
    }
}
