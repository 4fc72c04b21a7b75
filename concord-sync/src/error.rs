//! Error types for the sync layer.

use concord_doc::DocError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The replica rejected received operations.
    #[error("document error: {0}")]
    Doc(#[from] DocError),

    /// Invalid message encoding.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Reading or writing a framed message failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoded message exceeds the configured limit.
    #[error("message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    /// The peer speaks a different protocol version.
    #[error("protocol version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    /// Replicas still differ after the configured number of flush rounds.
    #[error("replicas did not converge after {rounds} rounds")]
    NotConverged { rounds: usize },

    /// No replica with this index exists in the network.
    #[error("unknown replica: {0}")]
    UnknownReplica(usize),
}
