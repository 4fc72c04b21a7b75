//! Error types for the document layer.

use concord_types::{OperationId, SharedId, TypeKind};
use thiserror::Error;

/// Result type for document operations.
pub type DocResult<T> = Result<T, DocError>;

/// Errors that can occur in document operations.
///
/// Conflicts are never errors: they are resolved silently. Operations
/// whose dependencies have not arrived yet are held back, not rejected.
#[derive(Debug, Error)]
pub enum DocError {
    /// Two different operations carry the same id. The replica stops
    /// integrating, since its state can no longer be trusted.
    #[error("identity collision on operation {id}")]
    IdentityCollision { id: OperationId },

    /// The replica was poisoned by an earlier identity collision.
    #[error("replica poisoned by identity collision on operation {id}")]
    Poisoned { id: OperationId },

    /// No shared type with this id exists on this replica.
    #[error("unknown shared type: {0}")]
    UnknownType(SharedId),

    /// The shared type exists but has a different kind.
    #[error("shared type {id} is a {actual}, not a {expected}")]
    WrongType {
        id: SharedId,
        expected: TypeKind,
        actual: TypeKind,
    },

    /// An array index or range is outside the visible sequence.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Too many operations are waiting for missing dependencies.
    #[error("pending buffer full ({limit} operations)")]
    PendingOverflow { limit: usize },

    /// A received operation could not be integrated.
    #[error("integration error: {0}")]
    Crdt(#[from] concord_crdt::Error),
}
