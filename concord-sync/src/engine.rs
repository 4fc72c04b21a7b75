//! Sync peer: stateful sync logic without I/O.
//!
//! A [`SyncPeer`] wraps one replica and is a pure state machine: it
//! produces and consumes [`SyncMessage`]s. Whoever owns the peer moves the
//! messages (see [`crate::LocalNetwork`] for an in-process version).

use crate::codec::MAX_MESSAGE_SIZE;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    MAX_BATCH_SIZE, OperationBatchMessage, PROTOCOL_VERSION, SyncMessage, SyncStep1Message,
    UpdateMessage,
};
use concord_crdt::{Operation, StateVector};
use concord_doc::Doc;
use concord_types::ReplicaId;
use std::collections::HashMap;
use tracing::{debug, info};

/// Configuration for sync peers.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum operations per `SyncStep2` batch.
    pub batch_size: usize,
    /// Maximum reconciliation rounds in [`crate::LocalNetwork::flush_all`].
    pub max_flush_rounds: usize,
    /// Maximum encoded message size in bytes.
    pub max_message_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            max_flush_rounds: 64,
            max_message_bytes: MAX_MESSAGE_SIZE,
        }
    }
}

/// One replica together with its sync bookkeeping.
#[derive(Debug)]
pub struct SyncPeer {
    /// The replica.
    doc: Doc,
    /// Configuration.
    config: SyncConfig,
    /// Last state vector each remote replica announced.
    remote_states: HashMap<ReplicaId, StateVector>,
}

impl SyncPeer {
    /// Creates a sync peer for a replica.
    #[must_use]
    pub fn new(doc: Doc, config: SyncConfig) -> Self {
        Self {
            doc,
            config,
            remote_states: HashMap::new(),
        }
    }

    /// Returns our replica id.
    #[must_use]
    pub fn replica_id(&self) -> ReplicaId {
        self.doc.replica_id()
    }

    /// Returns the replica.
    #[must_use]
    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    /// Returns the replica for local edits.
    pub fn doc_mut(&mut self) -> &mut Doc {
        &mut self.doc
    }

    /// Consumes the peer and returns the replica.
    #[must_use]
    pub fn into_doc(self) -> Doc {
        self.doc
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the last state vector a remote replica announced.
    #[must_use]
    pub fn remote_state(&self, replica: &ReplicaId) -> Option<&StateVector> {
        self.remote_states.get(replica)
    }

    // ── Message producers ────────────────────────────────────────

    /// Produces a `SyncStep1` announcing our state vector.
    #[must_use]
    pub fn make_step1(&self) -> SyncMessage {
        SyncMessage::SyncStep1(SyncStep1Message::new(
            self.replica_id(),
            self.doc.state_vector().clone(),
        ))
    }

    /// Produces an `Update` with the operations created locally since the
    /// last call, or `None` if there are none.
    pub fn make_update(&mut self) -> Option<SyncMessage> {
        let operations = self.doc.take_outbox();
        if operations.is_empty() {
            return None;
        }
        debug!(
            replica = %self.replica_id(),
            count = operations.len(),
            "producing update"
        );
        Some(SyncMessage::Update(UpdateMessage { operations }))
    }

    /// Splits the operations a peer is missing into `SyncStep2` batches.
    ///
    /// Always returns at least one (possibly empty) batch, the last one
    /// marked final.
    #[must_use]
    pub fn make_step2(&self, remote: &StateVector) -> Vec<SyncMessage> {
        let missing = self.doc.delta(remote);
        batches(missing, self.config.batch_size)
            .into_iter()
            .map(SyncMessage::SyncStep2)
            .collect()
    }

    // ── Message handling ─────────────────────────────────────────

    /// Handles an incoming message and returns the responses to send back.
    pub fn handle(&mut self, message: SyncMessage) -> SyncResult<Vec<SyncMessage>> {
        match message {
            SyncMessage::SyncStep1(step1) => {
                if step1.version != PROTOCOL_VERSION {
                    return Err(SyncError::VersionMismatch {
                        expected: PROTOCOL_VERSION,
                        got: step1.version,
                    });
                }
                let responses = self.make_step2(&step1.state_vector);
                debug!(
                    replica = %self.replica_id(),
                    remote = %step1.replica,
                    batches = responses.len(),
                    "answering sync step 1"
                );
                self.remote_states.insert(step1.replica, step1.state_vector);
                Ok(responses)
            }
            SyncMessage::SyncStep2(batch) => {
                self.integrate(batch.operations)?;
                Ok(Vec::new())
            }
            SyncMessage::Update(update) => {
                self.integrate(update.operations)?;
                Ok(Vec::new())
            }
        }
    }

    fn integrate(&mut self, operations: Vec<Operation>) -> SyncResult<()> {
        if operations.is_empty() {
            return Ok(());
        }
        let summary = self.doc.receive(operations)?;
        info!(
            replica = %self.replica_id(),
            applied = summary.applied,
            duplicates = summary.duplicates,
            pending = summary.pending,
            "integrated remote operations"
        );
        Ok(())
    }
}

fn batches(operations: Vec<Operation>, batch_size: usize) -> Vec<OperationBatchMessage> {
    let size = batch_size.max(1);
    let mut out: Vec<OperationBatchMessage> = Vec::new();
    let mut iter = operations.into_iter().peekable();
    let mut seq = 0u32;
    while iter.peek().is_some() {
        let chunk: Vec<Operation> = iter.by_ref().take(size).collect();
        out.push(OperationBatchMessage::new(chunk, seq));
        seq += 1;
    }
    match out.pop() {
        Some(last) => out.push(last.finalize()),
        None => out.push(OperationBatchMessage::new(Vec::new(), 0).finalize()),
    }
    out
}
