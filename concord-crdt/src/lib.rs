//! Replication primitives for Concord documents.
//!
//! This crate provides the building blocks the document engine is made of:
//!
//! - [`StateVector`]: causality tracking across replicas
//! - [`Operation`]: the immutable unit of replication
//! - [`OperationLog`]: append-only store of every known operation
//! - [`Slot`]: the multi-value register behind one map key
//! - [`Sequence`]: Replicated Growable Array behind shared arrays
//!
//! Integration in [`Slot`] and [`Sequence`] is commutative over causally
//! delivered operations: replicas that integrated the same set of
//! operations hold the same visible state, whatever the arrival order.

mod log;
mod operation;
mod sequence;
mod slot;
mod state_vector;

pub use log::OperationLog;
pub use operation::{OpKind, Operation};
pub use sequence::{Element, Sequence};
pub use slot::{Candidate, Slot, SlotOutcome, Tombstone};
pub use state_vector::{CausalOrder, StateVector};

use concord_types::OperationId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while integrating operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("duplicate operation: {0}")]
    DuplicateOperation(OperationId),

    #[error("unknown element: {0}")]
    UnknownElement(OperationId),

    #[error("insert {id} has rank {rank}, not above its origin")]
    InvalidRank { id: OperationId, rank: u64 },

    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}
