//! Transactions: batching of structural changes into observer events.
//!
//! A transaction records, for every map key it touches, which operation was
//! visible before the first change, and every array insert/remove in the
//! order they happened. On commit the map records are compared with the
//! current resolved state; keys whose winning operation did not change
//! produce no event.

use crate::event::{ArrayChange, ChangeKind, Changes, MapChange, TypeEvent};
use concord_types::{OperationId, SharedId, SharedRef, TypeKind, Value};
use std::collections::HashMap;

/// The visible entry of a map key: the winning operation and its value.
pub(crate) type Resolved = Option<(OperationId, Value)>;

#[derive(Debug, Default)]
struct MapTouches {
    order: Vec<String>,
    before: HashMap<String, Resolved>,
}

#[derive(Debug, Default)]
pub(crate) struct Transaction {
    /// Targets in order of first touch.
    targets: Vec<SharedRef>,
    maps: HashMap<SharedId, MapTouches>,
    arrays: HashMap<SharedId, Vec<ArrayChange>>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn touch_target(&mut self, target: SharedRef) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    /// Records the value of `key` before it is changed. Only the first
    /// call per key matters.
    pub(crate) fn touch_key(&mut self, target: SharedId, key: &str, before: Resolved) {
        self.touch_target(SharedRef::new(target, TypeKind::Map));
        let touches = self.maps.entry(target).or_default();
        if !touches.before.contains_key(key) {
            touches.order.push(key.to_string());
            touches.before.insert(key.to_string(), before);
        }
    }

    pub(crate) fn record_insert(&mut self, target: SharedId, index: usize, value: Value) {
        self.touch_target(SharedRef::new(target, TypeKind::Array));
        let changes = self.arrays.entry(target).or_default();
        if let Some(ArrayChange::Insert {
            index: start,
            values,
        }) = changes.last_mut()
        {
            if *start + values.len() == index {
                values.push(value);
                return;
            }
        }
        changes.push(ArrayChange::Insert {
            index,
            values: vec![value],
        });
    }

    pub(crate) fn record_remove(&mut self, target: SharedId, index: usize, value: Value) {
        self.touch_target(SharedRef::new(target, TypeKind::Array));
        let changes = self.arrays.entry(target).or_default();
        if let Some(ArrayChange::Remove {
            index: start,
            values,
        }) = changes.last_mut()
        {
            if *start == index {
                values.push(value);
                return;
            }
        }
        changes.push(ArrayChange::Remove {
            index,
            values: vec![value],
        });
    }

    /// Turns the recorded touches into events.
    ///
    /// `resolve` returns the current visible entry of a map key.
    pub(crate) fn into_events(
        self,
        mut resolve: impl FnMut(&SharedId, &str) -> Resolved,
    ) -> Vec<TypeEvent> {
        let Self {
            targets,
            mut maps,
            mut arrays,
        } = self;

        let mut events = Vec::new();
        for target in targets {
            let changes = match target.kind {
                TypeKind::Map => {
                    let Some(touches) = maps.remove(&target.id) else {
                        continue;
                    };
                    let mut changes = Vec::new();
                    for key in touches.order {
                        let before = touches.before.get(&key).cloned().flatten();
                        let after = resolve(&target.id, &key);
                        if let Some(change) = diff(key, before, after) {
                            changes.push(change);
                        }
                    }
                    if changes.is_empty() {
                        continue;
                    }
                    Changes::Map(changes)
                }
                TypeKind::Array => match arrays.remove(&target.id) {
                    Some(changes) if !changes.is_empty() => Changes::Array(changes),
                    _ => continue,
                },
            };
            events.push(TypeEvent { target, changes });
        }
        events
    }
}

fn diff(key: String, before: Resolved, after: Resolved) -> Option<MapChange> {
    match (before, after) {
        (None, None) => None,
        (None, Some(_)) => Some(MapChange {
            kind: ChangeKind::Add,
            key,
            previous: None,
        }),
        (Some((_, previous)), None) => Some(MapChange {
            kind: ChangeKind::Delete,
            key,
            previous: Some(previous),
        }),
        (Some((before_id, previous)), Some((after_id, _))) => {
            (before_id != after_id).then_some(MapChange {
                kind: ChangeKind::Update,
                key,
                previous: Some(previous),
            })
        }
    }
}
