//! Change events delivered to observers.
//!
//! One [`TypeEvent`] is produced per shared type touched by a transaction.
//! Events carry only the resolved outcome, so an observer cannot tell
//! whether a change originated locally or on another replica.

use concord_types::{SharedRef, Value};
use serde::{Deserialize, Serialize};

/// How a map key's resolved value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The key had no value and now has one.
    Add,
    /// The key's visible value was replaced.
    Update,
    /// The key had a value and now reads as absent.
    Delete,
}

/// A change to one map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapChange {
    /// What happened.
    pub kind: ChangeKind,
    /// The key.
    pub key: String,
    /// The value visible before the change (set for updates and deletes).
    pub previous: Option<Value>,
}

/// A change to an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArrayChange {
    /// Values were inserted starting at `index`.
    Insert { index: usize, values: Vec<Value> },
    /// Values that used to start at `index` were removed.
    Remove { index: usize, values: Vec<Value> },
}

/// The changes a transaction made to one shared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "changes", rename_all = "lowercase")]
pub enum Changes {
    Map(Vec<MapChange>),
    Array(Vec<ArrayChange>),
}

/// An event delivered to the observers of one shared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEvent {
    /// The shared type that changed.
    pub target: SharedRef,
    /// What changed.
    pub changes: Changes,
}

impl TypeEvent {
    /// Returns the map changes, if this is a map event.
    #[must_use]
    pub fn map_changes(&self) -> Option<&[MapChange]> {
        match &self.changes {
            Changes::Map(changes) => Some(changes),
            Changes::Array(_) => None,
        }
    }

    /// Returns the array changes, if this is an array event.
    #[must_use]
    pub fn array_changes(&self) -> Option<&[ArrayChange]> {
        match &self.changes {
            Changes::Array(changes) => Some(changes),
            Changes::Map(_) => None,
        }
    }
}
