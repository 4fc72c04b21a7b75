//! Handles for reading and writing shared maps.

use crate::doc::Doc;
use crate::error::DocResult;
use crate::event::TypeEvent;
use crate::observer::ObserverId;
use crate::shared::MapState;
use concord_crdt::OpKind;
use concord_types::{Content, SharedId, SharedRef, TypeKind, Value};

/// Read-only view of a shared map.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a> {
    doc: &'a Doc,
    id: SharedId,
}

impl<'a> MapView<'a> {
    pub(crate) fn new(doc: &'a Doc, id: SharedId) -> Self {
        Self { doc, id }
    }

    fn state(&self) -> Option<&'a MapState> {
        self.doc.map_state(&self.id)
    }

    /// Returns a reference to this map that can be stored and reopened.
    #[must_use]
    pub fn shared_ref(&self) -> SharedRef {
        SharedRef::new(self.id, TypeKind::Map)
    }

    /// Returns the visible value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state()?.resolve(key).map(|(_, value)| value)
    }

    /// Returns true if the key has a visible value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the keys with a visible value, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Returns all visible entries, in key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.state()
            .map(|state| {
                state
                    .visible()
                    .map(|(key, value)| (key.clone(), value))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of keys with a visible value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().map_or(0, |state| state.visible().count())
    }

    /// Returns true if no key has a visible value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the map and everything nested in it as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.doc.render(&self.id)
    }
}

/// Mutable handle to a shared map.
///
/// Every mutating call is one transaction: observers have been notified by
/// the time it returns, and the created operations are in the outbox.
#[derive(Debug)]
pub struct MapMut<'a> {
    doc: &'a mut Doc,
    id: SharedId,
}

impl<'a> MapMut<'a> {
    pub(crate) fn new(doc: &'a mut Doc, id: SharedId) -> Self {
        Self { doc, id }
    }

    /// Returns a read-only view.
    #[must_use]
    pub fn view(&self) -> MapView<'_> {
        MapView::new(&*self.doc, self.id)
    }

    /// Returns a reference to this map that can be stored and reopened.
    #[must_use]
    pub fn shared_ref(&self) -> SharedRef {
        SharedRef::new(self.id, TypeKind::Map)
    }

    /// Returns the visible value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.view().get(key)
    }

    /// Returns true if the key has a visible value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.view().contains_key(key)
    }

    /// Returns the keys with a visible value, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.view().keys()
    }

    /// Returns all visible entries, in key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.view().entries()
    }

    /// Returns the number of keys with a visible value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.view().len()
    }

    /// Returns true if no key has a visible value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    /// Renders the map and everything nested in it as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.view().to_json()
    }

    /// Sets a key.
    ///
    /// Setting a type kind creates a new nested shared type; the returned
    /// value is a [`Value::Shared`] reference to it, ready to use.
    pub fn set(&mut self, key: impl Into<String>, content: impl Into<Content>) -> DocResult<Value> {
        let key = key.into();
        let content = content.into();
        let written = content.clone();
        let target = self.id;
        self.doc.transact(|doc, txn| {
            let op = doc.create_local(txn, target, OpKind::Set { key, content })?;
            Ok(Value::from_content(&written, op.id))
        })
    }

    /// Deletes a key. Returns false, creating no operation, if the key had
    /// no visible value.
    pub fn delete(&mut self, key: &str) -> DocResult<bool> {
        if !self.contains_key(key) {
            return Ok(false);
        }
        let target = self.id;
        let key = key.to_string();
        self.doc.transact(|doc, txn| {
            doc.create_local(txn, target, OpKind::Delete { key })?;
            Ok(true)
        })
    }

    /// Registers an observer for this map.
    pub fn observe<F>(&mut self, callback: F) -> DocResult<ObserverId>
    where
        F: FnMut(&TypeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        let shared = self.shared_ref();
        self.doc.observe(shared, callback)
    }

    /// Unregisters an observer of this map.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let shared = self.shared_ref();
        self.doc.unobserve(shared, id)
    }
}
