//! In-process network of replicas.
//!
//! Messages between peers are encoded with the wire codec and queued, so
//! everything a real transport would carry goes through serialization.
//! Delivery happens only when asked for, which lets tests build arbitrary
//! interleavings of local edits and exchanges.

use crate::codec;
use crate::engine::{SyncConfig, SyncPeer};
use crate::error::{SyncError, SyncResult};
use concord_doc::{Doc, DocConfig};
use concord_types::ReplicaId;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// An encoded message in flight.
#[derive(Debug)]
struct Envelope {
    from: usize,
    to: usize,
    bytes: Vec<u8>,
}

/// Replicas connected by an in-memory message queue.
#[derive(Debug)]
pub struct LocalNetwork {
    peers: Vec<SyncPeer>,
    queue: VecDeque<Envelope>,
    config: SyncConfig,
}

impl LocalNetwork {
    /// Creates `count` empty replicas. Replica `i` gets the id `i + 1`, so
    /// lower indices have lower replica ids.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let docs = (0..count)
            .map(|i| Doc::with_config(ReplicaId::from_u128(i as u128 + 1), DocConfig::default()))
            .collect();
        Self::from_docs(docs, SyncConfig::default())
    }

    /// Connects existing replicas.
    #[must_use]
    pub fn from_docs(docs: Vec<Doc>, config: SyncConfig) -> Self {
        let peers = docs
            .into_iter()
            .map(|doc| SyncPeer::new(doc, config.clone()))
            .collect();
        Self {
            peers,
            queue: VecDeque::new(),
            config,
        }
    }

    /// Returns the number of replicas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Returns the number of messages waiting for delivery.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Returns a replica.
    pub fn replica(&self, index: usize) -> SyncResult<&Doc> {
        self.peers
            .get(index)
            .map(SyncPeer::doc)
            .ok_or(SyncError::UnknownReplica(index))
    }

    /// Returns a replica for local edits.
    pub fn replica_mut(&mut self, index: usize) -> SyncResult<&mut Doc> {
        self.peers
            .get_mut(index)
            .map(SyncPeer::doc_mut)
            .ok_or(SyncError::UnknownReplica(index))
    }

    /// Returns all replicas.
    pub fn replicas(&self) -> impl Iterator<Item = &Doc> {
        self.peers.iter().map(SyncPeer::doc)
    }

    /// Queues the local operations of replica `from` for every other
    /// replica. Returns the number of operations broadcast.
    pub fn broadcast(&mut self, from: usize) -> SyncResult<usize> {
        let peer = self
            .peers
            .get_mut(from)
            .ok_or(SyncError::UnknownReplica(from))?;
        let Some(update) = peer.make_update() else {
            return Ok(0);
        };
        let count = update.operations().len();
        let bytes = codec::encode(&update, self.config.max_message_bytes)?;
        for to in (0..self.peers.len()).filter(|&to| to != from) {
            self.queue.push_back(Envelope {
                from,
                to,
                bytes: bytes.clone(),
            });
        }
        Ok(count)
    }

    /// Queues a `SyncStep1` from `from` to `to`.
    pub fn request_sync(&mut self, from: usize, to: usize) -> SyncResult<()> {
        if to >= self.peers.len() {
            return Err(SyncError::UnknownReplica(to));
        }
        let step1 = self
            .peers
            .get(from)
            .ok_or(SyncError::UnknownReplica(from))?
            .make_step1();
        let bytes = codec::encode(&step1, self.config.max_message_bytes)?;
        self.queue.push_back(Envelope { from, to, bytes });
        Ok(())
    }

    /// Delivers queued messages, including any responses they trigger,
    /// until the queue is empty. Returns the number of messages delivered.
    pub fn deliver_all(&mut self) -> SyncResult<usize> {
        let limit = self.config.max_message_bytes;
        let mut delivered = 0;
        while let Some(envelope) = self.queue.pop_front() {
            let message = codec::decode(&envelope.bytes, limit)?;
            debug!(
                from = envelope.from,
                to = envelope.to,
                kind = message.name(),
                "delivering message"
            );
            let peer = self
                .peers
                .get_mut(envelope.to)
                .ok_or(SyncError::UnknownReplica(envelope.to))?;
            let responses = peer.handle(message)?;
            delivered += 1;
            for response in responses {
                self.queue.push_back(Envelope {
                    from: envelope.to,
                    to: envelope.from,
                    bytes: codec::encode(&response, limit)?,
                });
            }
        }
        Ok(delivered)
    }

    /// Brings every replica up to date with every other.
    ///
    /// Pending local operations are broadcast first; then every ordered
    /// pair of replicas reconciles until all state vectors agree.
    pub fn flush_all(&mut self) -> SyncResult<()> {
        for from in 0..self.peers.len() {
            self.broadcast(from)?;
        }
        self.deliver_all()?;

        for round in 1..=self.config.max_flush_rounds {
            if self.is_converged() {
                debug!(rounds = round - 1, "replicas converged");
                info!(replicas = self.peers.len(), "all replicas in sync");
                return Ok(());
            }
            for from in 0..self.peers.len() {
                for to in 0..self.peers.len() {
                    if from != to {
                        self.request_sync(from, to)?;
                    }
                }
            }
            self.deliver_all()?;
        }

        if self.is_converged() {
            return Ok(());
        }
        warn!(
            rounds = self.config.max_flush_rounds,
            "replicas did not converge"
        );
        Err(SyncError::NotConverged {
            rounds: self.config.max_flush_rounds,
        })
    }

    /// Returns true if every replica has integrated the same operations
    /// and holds nothing back.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        let Some(first) = self.peers.first() else {
            return true;
        };
        self.peers.iter().all(|peer| {
            peer.doc().pending_len() == 0
                && peer.doc().state_vector() == first.doc().state_vector()
        })
    }
}
