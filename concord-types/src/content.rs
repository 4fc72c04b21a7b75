//! Content carried by Set and Insert operations, and the values readers see.
//!
//! A writer either stores a primitive JSON value or asks for a fresh nested
//! shared type ([`Content::Type`]). Once the operation integrates, a type
//! request is read back as [`Value::Shared`], never as the request itself.

use crate::SharedId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a shared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Keyed map of registers.
    Map,
    /// Ordered sequence.
    Array,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map => f.write_str("map"),
            Self::Array => f.write_str("array"),
        }
    }
}

/// Payload of a Set or Insert operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content", content = "value", rename_all = "snake_case")]
pub enum Content {
    /// A plain JSON value.
    Primitive(serde_json::Value),
    /// A request to create a nested shared type of the given kind.
    Type(TypeKind),
}

impl Content {
    /// Creates primitive content from anything convertible to JSON.
    #[must_use]
    pub fn primitive(value: impl Into<serde_json::Value>) -> Self {
        Self::Primitive(value.into())
    }

    /// Returns the requested type kind, if this is a type request.
    #[must_use]
    pub fn type_kind(&self) -> Option<TypeKind> {
        match self {
            Self::Type(kind) => Some(*kind),
            Self::Primitive(_) => None,
        }
    }
}

impl From<TypeKind> for Content {
    fn from(kind: TypeKind) -> Self {
        Self::Type(kind)
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Self::Primitive(value)
    }
}

macro_rules! primitive_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Content {
                fn from(value: $ty) -> Self {
                    Self::Primitive(serde_json::Value::from(value))
                }
            }
        )*
    };
}

primitive_from!(&str, String, bool, i32, i64, u32, u64, f64);

/// Reference to a live shared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedRef {
    /// Identity of the shared type.
    pub id: SharedId,
    /// Whether it is a map or an array.
    pub kind: TypeKind,
}

impl SharedRef {
    /// Creates a new reference.
    #[must_use]
    pub const fn new(id: SharedId, kind: TypeKind) -> Self {
        Self { id, kind }
    }

    /// The implicit root map of every document.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            id: SharedId::Root,
            kind: TypeKind::Map,
        }
    }
}

impl fmt::Display for SharedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// A resolved, readable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value", content = "data", rename_all = "snake_case")]
pub enum Value {
    /// A plain JSON value.
    Primitive(serde_json::Value),
    /// A nested shared type.
    Shared(SharedRef),
}

impl Value {
    /// Returns the primitive JSON value, if this is one.
    #[must_use]
    pub fn as_primitive(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Primitive(v) => Some(v),
            Self::Shared(_) => None,
        }
    }

    /// Returns the shared type reference, if this is one.
    #[must_use]
    pub fn as_shared(&self) -> Option<SharedRef> {
        match self {
            Self::Shared(r) => Some(*r),
            Self::Primitive(_) => None,
        }
    }

    /// Resolves content written by `creator` into the value readers see.
    #[must_use]
    pub fn from_content(content: &Content, creator: crate::OperationId) -> Self {
        match content {
            Content::Primitive(v) => Self::Primitive(v.clone()),
            Content::Type(kind) => Self::Shared(SharedRef::new(SharedId::Nested(creator), *kind)),
        }
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.as_primitive() == Some(other)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::Primitive(value)
    }
}

impl From<SharedRef> for Value {
    fn from(shared: SharedRef) -> Self {
        Self::Shared(shared)
    }
}
