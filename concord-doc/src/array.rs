//! Handles for reading and writing shared arrays.

use crate::doc::Doc;
use crate::error::{DocError, DocResult};
use crate::event::TypeEvent;
use crate::observer::ObserverId;
use concord_crdt::{OpKind, Sequence};
use concord_types::{Content, OperationId, SharedId, SharedRef, TypeKind, Value};

/// Read-only view of a shared array.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    doc: &'a Doc,
    id: SharedId,
}

impl<'a> ArrayView<'a> {
    pub(crate) fn new(doc: &'a Doc, id: SharedId) -> Self {
        Self { doc, id }
    }

    fn sequence(&self) -> Option<&'a Sequence> {
        self.doc.sequence(&self.id)
    }

    /// Returns a reference to this array that can be stored and reopened.
    #[must_use]
    pub fn shared_ref(&self) -> SharedRef {
        SharedRef::new(self.id, TypeKind::Array)
    }

    /// Returns the number of visible elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence().map_or(0, Sequence::len)
    }

    /// Returns true if the array has no visible elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the visible element at an index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        let elem = self.sequence()?.get(index)?;
        Some(Value::from_content(&elem.content, elem.id))
    }

    /// Returns the visible elements in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.sequence()
            .map(|seq| {
                seq.iter()
                    .map(|e| Value::from_content(&e.content, e.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Renders the array and everything nested in it as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.doc.render(&self.id)
    }
}

/// Mutable handle to a shared array.
#[derive(Debug)]
pub struct ArrayMut<'a> {
    doc: &'a mut Doc,
    id: SharedId,
}

impl<'a> ArrayMut<'a> {
    pub(crate) fn new(doc: &'a mut Doc, id: SharedId) -> Self {
        Self { doc, id }
    }

    /// Returns a read-only view.
    #[must_use]
    pub fn view(&self) -> ArrayView<'_> {
        ArrayView::new(&*self.doc, self.id)
    }

    /// Returns a reference to this array that can be stored and reopened.
    #[must_use]
    pub fn shared_ref(&self) -> SharedRef {
        SharedRef::new(self.id, TypeKind::Array)
    }

    /// Returns the number of visible elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.view().len()
    }

    /// Returns true if the array has no visible elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    /// Returns the visible element at an index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.view().get(index)
    }

    /// Returns the visible elements in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.view().to_vec()
    }

    /// Renders the array and everything nested in it as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.view().to_json()
    }

    /// Inserts items so that the first one ends up at `index`.
    ///
    /// All items are created in one transaction, each one after the
    /// previous, so they stay contiguous. Returns the inserted values;
    /// nested types among them are ready to use.
    pub fn insert<I, C>(&mut self, index: usize, items: I) -> DocResult<Vec<Value>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        let items: Vec<Content> = items.into_iter().map(Into::into).collect();
        let len = self.len();
        if index > len {
            return Err(DocError::IndexOutOfBounds { index, len });
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let target = self.id;
        self.doc.transact(|doc, txn| {
            let mut origin = sequence_of(doc, target)?.origin_for_index(index)?;
            let mut values = Vec::with_capacity(items.len());
            for content in items {
                let rank = sequence_of(doc, target)?.next_rank();
                let written = content.clone();
                let op = doc.create_local(
                    txn,
                    target,
                    OpKind::Insert {
                        origin,
                        rank,
                        content,
                    },
                )?;
                values.push(Value::from_content(&written, op.id));
                origin = Some(op.id);
            }
            Ok(values)
        })
    }

    /// Appends items at the end.
    pub fn push<I, C>(&mut self, items: I) -> DocResult<Vec<Value>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        let len = self.len();
        self.insert(len, items)
    }

    /// Removes `count` elements starting at `index`. Returns the removed
    /// values.
    pub fn remove(&mut self, index: usize, count: usize) -> DocResult<Vec<Value>> {
        let len = self.len();
        match index.checked_add(count) {
            Some(end) if end <= len => {}
            _ => return Err(DocError::IndexOutOfBounds { index, len }),
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let target = self.id;
        self.doc.transact(|doc, txn| {
            let doomed: Vec<(OperationId, Value)> = sequence_of(doc, target)?
                .iter()
                .skip(index)
                .take(count)
                .map(|e| (e.id, Value::from_content(&e.content, e.id)))
                .collect();
            let mut removed = Vec::with_capacity(doomed.len());
            for (element, value) in doomed {
                doc.create_local(txn, target, OpKind::Remove { element })?;
                removed.push(value);
            }
            Ok(removed)
        })
    }

    /// Registers an observer for this array.
    pub fn observe<F>(&mut self, callback: F) -> DocResult<ObserverId>
    where
        F: FnMut(&TypeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        let shared = self.shared_ref();
        self.doc.observe(shared, callback)
    }

    /// Unregisters an observer of this array.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let shared = self.shared_ref();
        self.doc.unobserve(shared, id)
    }
}

fn sequence_of(doc: &Doc, id: SharedId) -> DocResult<&Sequence> {
    doc.sequence(&id).ok_or(DocError::UnknownType(id))
}
