//! Replicated Growable Array (RGA) backing shared arrays.
//!
//! Every element remembers the element it was inserted after (its origin)
//! and a rank one greater than every rank its author had seen in the
//! sequence. Elements are placed right after their origin, skipping any
//! elements with a greater `(rank, id)` key. Because a child always
//! outranks its origin, the skipped run is exactly the set of concurrent
//! siblings that win precedence, together with their descendants, and the
//! resulting order is the same on every replica regardless of the order in
//! which inserts arrive.
//!
//! Removed elements stay in place as tombstones so that later inserts can
//! still use them as origins.
//!
//! Based on "A comprehensive study of Convergent and Commutative Replicated
//! Data Types" (Shapiro et al.) and Yjs/Automerge implementations.

use crate::{Error, Result};
use concord_types::{Content, OperationId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// An element in the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// The id of the Insert operation that created it.
    pub id: OperationId,
    /// The element this one was inserted after (`None` = head).
    pub origin: Option<OperationId>,
    /// Sibling precedence.
    pub rank: u64,
    /// The element's content.
    pub content: Content,
    /// Set once a Remove operation has been integrated.
    pub removed: bool,
}

impl Element {
    fn precedes(&self, rank: u64, id: &OperationId) -> bool {
        match self.rank.cmp(&rank) {
            Ordering::Equal => self.id > *id,
            ord => ord == Ordering::Greater,
        }
    }
}

/// An ordered sequence of elements with tombstones.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    /// Element ids in document order, tombstones included.
    order: Vec<OperationId>,
    /// All elements, indexed by id.
    elements: HashMap<OperationId, Element>,
    /// Highest rank seen so far.
    max_rank: u64,
}

impl Sequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of visible (non-removed) elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.values().filter(|e| !e.removed).count()
    }

    /// Returns true if no element is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements including tombstones.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.order.len()
    }

    /// Rank to use for the next local insert.
    #[must_use]
    pub fn next_rank(&self) -> u64 {
        self.max_rank + 1
    }

    /// Returns the visible elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.order
            .iter()
            .filter_map(|id| self.elements.get(id))
            .filter(|e| !e.removed)
    }

    /// Returns the visible contents in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Content> {
        self.iter().map(|e| e.content.clone()).collect()
    }

    /// Returns the visible element at an index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Element> {
        self.iter().nth(index)
    }

    /// Returns the id of the visible element at an index.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<OperationId> {
        self.get(index).map(|e| e.id)
    }

    /// Returns the visible index of an element, if it exists and is not removed.
    #[must_use]
    pub fn index_of(&self, target: &OperationId) -> Option<usize> {
        let mut visible = 0;
        for id in &self.order {
            let elem = self.elements.get(id)?;
            if elem.removed {
                continue;
            }
            if id == target {
                return Some(visible);
            }
            visible += 1;
        }
        None
    }

    /// Returns whether an element exists (even if removed).
    #[must_use]
    pub fn contains(&self, id: &OperationId) -> bool {
        self.elements.contains_key(id)
    }

    /// Returns whether an element is removed.
    #[must_use]
    pub fn is_removed(&self, id: &OperationId) -> bool {
        self.elements.get(id).is_some_and(|e| e.removed)
    }

    /// Finds the origin for inserting at a visible index.
    ///
    /// Index 0 inserts at the head; otherwise the new element goes right
    /// after the visible element at `index - 1`.
    pub fn origin_for_index(&self, index: usize) -> Result<Option<OperationId>> {
        if index == 0 {
            return Ok(None);
        }
        self.id_at(index - 1)
            .map(Some)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            })
    }

    /// Integrates an Insert operation and returns the new element's visible
    /// index.
    pub fn insert(
        &mut self,
        id: OperationId,
        origin: Option<OperationId>,
        rank: u64,
        content: Content,
    ) -> Result<usize> {
        if self.elements.contains_key(&id) {
            return Err(Error::DuplicateOperation(id));
        }

        let mut pos = match origin {
            None => 0,
            Some(origin_id) => {
                let origin_elem = self
                    .elements
                    .get(&origin_id)
                    .ok_or(Error::UnknownElement(origin_id))?;
                if rank <= origin_elem.rank {
                    return Err(Error::InvalidRank { id, rank });
                }
                self.position(&origin_id)
                    .ok_or(Error::UnknownElement(origin_id))?
                    + 1
            }
        };

        // Skip elements that take precedence over the new one.
        while pos < self.order.len() {
            let next = &self.elements[&self.order[pos]];
            if !next.precedes(rank, &id) {
                break;
            }
            pos += 1;
        }

        self.order.insert(pos, id);
        self.elements.insert(
            id,
            Element {
                id,
                origin,
                rank,
                content,
                removed: false,
            },
        );
        self.max_rank = self.max_rank.max(rank);

        Ok(self.visible_before(pos))
    }

    /// Integrates a Remove operation.
    ///
    /// Returns the visible index and content the element had, or `None` if
    /// it was already removed.
    pub fn remove(&mut self, id: &OperationId) -> Result<Option<(usize, Content)>> {
        let pos = self.position(id).ok_or(Error::UnknownElement(*id))?;
        let index = self.visible_before(pos);
        let elem = self
            .elements
            .get_mut(id)
            .ok_or(Error::UnknownElement(*id))?;
        if elem.removed {
            return Ok(None);
        }
        elem.removed = true;
        Ok(Some((index, elem.content.clone())))
    }

    fn position(&self, id: &OperationId) -> Option<usize> {
        self.order.iter().position(|x| x == id)
    }

    fn visible_before(&self, pos: usize) -> usize {
        self.order[..pos]
            .iter()
            .filter(|id| self.elements.get(id).is_some_and(|e| !e.removed))
            .count()
    }
}
