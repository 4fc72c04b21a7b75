//! Core type definitions for Concord.
//!
//! This crate defines the fundamental types shared by every layer of the
//! replicated document engine:
//! - Replica and operation identifiers
//! - The per-replica logical clock that mints operation ids
//! - Operation content (primitives and nested-type requests) and the
//!   resolved values readers see

mod clock;
mod content;
mod ids;

pub use clock::LocalClock;
pub use content::{Content, SharedRef, TypeKind, Value};
pub use ids::{OperationId, ReplicaId, SharedId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid operation id: {0}")]
    InvalidOperationId(String),
}
