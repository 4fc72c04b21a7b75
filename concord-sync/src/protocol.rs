//! Sync protocol messages.
//!
//! Two replicas reconcile in two steps:
//! 1. Each sends its state vector (`SyncStep1`).
//! 2. Each answers with the operations the other is missing, dependencies
//!    first, in batches (`SyncStep2`).
//!
//! Once reconciled, replicas push newly created operations to each other
//! as `Update`s. Receivers buffer operations that arrive ahead of their
//! dependencies, so batches and updates may be delivered in any order.

use concord_crdt::{Operation, StateVector};
use concord_types::ReplicaId;
use serde::{Deserialize, Serialize};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum number of operations to send in a single batch.
pub const MAX_BATCH_SIZE: usize = 500;

/// A sync protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    /// "This is what I have."
    SyncStep1(SyncStep1Message),

    /// "These are the operations you are missing."
    SyncStep2(OperationBatchMessage),

    /// Operations created locally since the last update.
    Update(UpdateMessage),
}

impl SyncMessage {
    /// Returns the operations carried by this message.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        match self {
            Self::SyncStep1(_) => &[],
            Self::SyncStep2(batch) => &batch.operations,
            Self::Update(update) => &update.operations,
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncStep1(_) => "sync_step1",
            Self::SyncStep2(_) => "sync_step2",
            Self::Update(_) => "update",
        }
    }
}

/// First step of reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStep1Message {
    /// Protocol version.
    pub version: u32,
    /// Sender's replica id.
    pub replica: ReplicaId,
    /// Everything the sender has integrated.
    pub state_vector: StateVector,
}

impl SyncStep1Message {
    /// Creates a new step 1 message.
    #[must_use]
    pub fn new(replica: ReplicaId, state_vector: StateVector) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            replica,
            state_vector,
        }
    }
}

/// Batch of operations answering a `SyncStep1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationBatchMessage {
    /// The operations, dependencies first.
    pub operations: Vec<Operation>,
    /// Batch sequence number.
    pub batch_seq: u32,
    /// Whether this is the last batch of the answer.
    pub is_final: bool,
}

impl OperationBatchMessage {
    /// Creates a new batch.
    #[must_use]
    pub fn new(operations: Vec<Operation>, batch_seq: u32) -> Self {
        Self {
            operations,
            batch_seq,
            is_final: false,
        }
    }

    /// Marks this as the final batch.
    #[must_use]
    pub fn finalize(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// Newly created operations pushed to connected peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// The operations, in creation order.
    pub operations: Vec<Operation>,
}
