//! Identifier types used throughout the Concord core.
//!
//! Replicas are identified by UUIDs (v7 when freshly minted). Operations are
//! identified by the pair of the authoring replica and its local clock.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Unique identifier for a replica (one independent copy of a document).
///
/// Ordered lexicographically on the UUID bytes, which is the order used to
/// break clock ties between operations of different replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(Uuid);

impl ReplicaId {
    /// Creates a new replica ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a replica ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a replica ID from a number. Handy for deterministic tests.
    #[must_use]
    pub const fn from_u128(n: u128) -> Self {
        Self(Uuid::from_u128(n))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a replica ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ReplicaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReplicaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Globally unique identifier of an operation.
///
/// Totally ordered: by clock first, then by replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId {
    /// The authoring replica's clock value for this operation (starts at 1).
    pub clock: u64,
    /// The replica that authored the operation.
    pub replica: ReplicaId,
}

impl OperationId {
    /// Creates a new operation ID.
    #[must_use]
    pub const fn new(replica: ReplicaId, clock: u64) -> Self {
        Self { clock, replica }
    }
}

impl PartialOrd for OperationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OperationId {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.clock.cmp(&other.clock) {
            Ordering::Equal => self.replica.cmp(&other.replica),
            ord => ord,
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.clock, self.replica)
    }
}

impl FromStr for OperationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (clock, replica) = s
            .split_once('@')
            .ok_or_else(|| Error::InvalidOperationId(s.to_string()))?;
        let clock: u64 = clock
            .parse()
            .map_err(|_| Error::InvalidOperationId(s.to_string()))?;
        let replica = ReplicaId::parse(replica)?;
        Ok(Self::new(replica, clock))
    }
}

/// Identity of a shared type inside a document.
///
/// Every document has one implicit root map. All other shared types are
/// identified by the operation that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum SharedId {
    /// The implicit root map.
    Root,
    /// A nested type created by the given operation.
    Nested(OperationId),
}

impl SharedId {
    /// Returns true if this is the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// Returns the creating operation, if any.
    #[must_use]
    pub fn creator(&self) -> Option<OperationId> {
        match self {
            Self::Root => None,
            Self::Nested(id) => Some(*id),
        }
    }
}

impl fmt::Display for SharedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Nested(id) => write!(f, "type:{id}"),
        }
    }
}
