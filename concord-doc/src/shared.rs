//! In-memory state of shared types.

use crate::transaction::Resolved;
use concord_crdt::{Sequence, Slot};
use concord_types::{TypeKind, Value};
use std::collections::BTreeMap;

/// Keyed map: one slot per key ever written.
#[derive(Debug, Clone, Default)]
pub(crate) struct MapState {
    pub(crate) slots: BTreeMap<String, Slot>,
}

impl MapState {
    /// Returns the visible entry of a key.
    pub(crate) fn resolve(&self, key: &str) -> Resolved {
        let candidate = self.slots.get(key)?.resolve()?;
        Some((
            candidate.op.id,
            Value::from_content(&candidate.content, candidate.op.id),
        ))
    }

    /// Returns all keys with a visible value, in key order.
    pub(crate) fn visible(&self) -> impl Iterator<Item = (&String, Value)> {
        self.slots.iter().filter_map(|(key, slot)| {
            let candidate = slot.resolve()?;
            Some((
                key,
                Value::from_content(&candidate.content, candidate.op.id),
            ))
        })
    }
}

/// A shared type instance.
#[derive(Debug, Clone)]
pub(crate) enum SharedType {
    Map(MapState),
    Array(Sequence),
}

impl SharedType {
    pub(crate) fn new(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Map => Self::Map(MapState::default()),
            TypeKind::Array => Self::Array(Sequence::new()),
        }
    }

    pub(crate) fn kind(&self) -> TypeKind {
        match self {
            Self::Map(_) => TypeKind::Map,
            Self::Array(_) => TypeKind::Array,
        }
    }
}
