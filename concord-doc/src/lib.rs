//! Replicated shared documents.
//!
//! A [`Doc`] is one replica of a document made of nested shared types: a
//! root map whose values can be primitives or further maps and arrays.
//! Replicas mutate their own copy without coordination and exchange
//! [`Operation`]s; any two replicas that integrated the same operations
//! show the same document.
//!
//! ```text
//!   local call ──► create op ──┐
//!                              ├──► integrate ──► transaction ──► observers
//!   receive()  ──► causal buffer ┘        │
//!                                          └──► log / state vector / outbox
//! ```
//!
//! Map conflicts resolve deterministically: among concurrent writes to one
//! key the operation with the smallest id wins, a write supersedes what
//! its author had seen, and a delete removes every write that did not
//! causally follow it.

mod array;
mod config;
mod doc;
mod error;
mod event;
mod map;
mod observer;
mod shared;
mod transaction;

pub use array::{ArrayMut, ArrayView};
pub use config::DocConfig;
pub use doc::{Doc, ReceiveSummary};
pub use error::{DocError, DocResult};
pub use event::{ArrayChange, ChangeKind, Changes, MapChange, TypeEvent};
pub use map::{MapMut, MapView};
pub use observer::{ObserverError, ObserverFn, ObserverId};

pub use concord_crdt::{OpKind, Operation, StateVector};
pub use concord_types::{Content, OperationId, ReplicaId, SharedId, SharedRef, TypeKind, Value};
