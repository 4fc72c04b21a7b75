//! Per-replica logical clock.
//!
//! Every locally created operation consumes exactly one clock value, so a
//! replica's operations form a contiguous sequence `1, 2, 3, ...`. The
//! contiguity is what allows a state vector to summarise "everything seen
//! from a replica" with a single number.

use crate::{OperationId, ReplicaId};
use serde::{Deserialize, Serialize};

/// Logical clock owned by a single replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalClock {
    /// The replica this clock mints ids for.
    replica: ReplicaId,
    /// Clock of the last minted operation (0 before the first one).
    current: u64,
}

impl LocalClock {
    /// Creates a fresh clock for a replica.
    #[must_use]
    pub const fn new(replica: ReplicaId) -> Self {
        Self {
            replica,
            current: 0,
        }
    }

    /// Returns the owning replica.
    #[must_use]
    pub const fn replica(&self) -> ReplicaId {
        self.replica
    }

    /// Returns the clock value of the last minted id.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Advances the clock and returns the next operation id.
    ///
    /// Call once per locally created operation, before the operation
    /// becomes visible.
    pub fn next_id(&mut self) -> OperationId {
        self.current += 1;
        OperationId::new(self.replica, self.current)
    }

    /// Returns the id the next call to [`next_id`](Self::next_id) would mint.
    #[must_use]
    pub const fn peek(&self) -> OperationId {
        OperationId::new(self.replica, self.current + 1)
    }
}
