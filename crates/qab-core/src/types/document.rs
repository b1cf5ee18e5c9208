//! Remote document representation.
//!
//! A document is the unit delivered by the change feed: an identifier plus a
//! flat field map. Field values are kept as raw [`serde_json::Value`]s; typed
//! extraction happens in [`TestPayload`](super::TestPayload).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hash::FxHashMap;

/// An opaque identifier for a remote document.
///
/// Uses a newtype pattern for type safety - prevents accidentally using a
/// raw string where a document id is expected. For the spool transport the
/// id is the spool file stem.
///
/// # Examples
///
/// ```
/// use qab_core::DocumentId;
///
/// let id1 = DocumentId::new("doc-42");
/// let id2 = DocumentId::new("doc-42");
///
/// assert_eq!(id1, id2);
/// assert_eq!(id1.as_str(), "doc-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Creates a new document id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DocumentId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A remote record: an identifier and a flat field map.
///
/// Documents are transient - created by the feed per change, consumed once by
/// the dispatcher, never persisted or mutated.
///
/// # Examples
///
/// ```
/// use qab_core::Document;
///
/// let doc = Document::new("doc-1")
///     .with_field("pkg", "com.example")
///     .with_field("file", "FooTest.java");
///
/// assert_eq!(doc.str_field("pkg"), Some("com.example"));
/// assert_eq!(doc.str_field("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier within the collection.
    pub id: DocumentId,

    /// The document's field map.
    pub fields: FxHashMap<String, Value>,
}

impl Document {
    /// Creates a new document with an empty field map.
    #[must_use]
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            fields: FxHashMap::default(),
        }
    }

    /// Creates a document from an already-built field map.
    #[must_use]
    pub fn with_fields(id: impl Into<DocumentId>, fields: FxHashMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Adds a field, consuming and returning the document.
    ///
    /// Primarily a convenience for tests and in-process feeds.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the raw value of a field, if present.
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a field as a string slice, if present and a string.
    #[inline]
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
