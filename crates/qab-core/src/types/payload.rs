//! The validated payload extracted from a document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::Document;

/// Field carrying the dotted package identifier.
pub const FIELD_PKG: &str = "pkg";

/// Field carrying the target filename (with extension).
pub const FIELD_FILE: &str = "file";

/// Field carrying the file content.
pub const FIELD_CODE: &str = "code";

/// Why a document failed to yield a [`TestPayload`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// A required field is absent or an empty string.
    #[error("missing or empty field '{field}'")]
    MissingField {
        /// The name of the offending field.
        field: &'static str,
    },

    /// A required field is present but not a string.
    #[error("field '{field}' is not a string")]
    NotAString {
        /// The name of the offending field.
        field: &'static str,
    },
}

/// The validated triple a document must carry to be materialized.
///
/// Invariant: all three fields are non-empty. Constructing a payload through
/// [`TestPayload::from_document`] is the only way the dispatcher obtains one,
/// so a payload in hand is always well-formed.
///
/// # Examples
///
/// ```
/// use qab_core::{Document, TestPayload};
///
/// let doc = Document::new("doc-1")
///     .with_field("pkg", "com.example.foo")
///     .with_field("file", "FooTest.java")
///     .with_field("code", "class FooTest {}");
///
/// let payload = TestPayload::from_document(&doc).unwrap();
/// assert_eq!(payload.package, "com.example.foo");
/// assert_eq!(payload.filename, "FooTest.java");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPayload {
    /// Dotted package identifier, mapped to nested directories.
    pub package: String,

    /// Target filename, including extension.
    pub filename: String,

    /// File content, written verbatim.
    pub content: String,
}

impl TestPayload {
    /// Extracts and validates a payload from a document's field map.
    ///
    /// All three of `pkg`, `file`, and `code` must be present, strings, and
    /// non-empty. Values are used as-is beyond that check; in particular the
    /// package is not validated against the filesystem here.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::MissingField`] for an absent or empty field
    /// and [`PayloadError::NotAString`] for a non-string value.
    pub fn from_document(document: &Document) -> Result<Self, PayloadError> {
        Ok(Self {
            package: required_field(document, FIELD_PKG)?,
            filename: required_field(document, FIELD_FILE)?,
            content: required_field(document, FIELD_CODE)?,
        })
    }
}

/// Reads one required non-empty string field.
fn required_field(document: &Document, field: &'static str) -> Result<String, PayloadError> {
    match document.field(field) {
        None | Some(Value::Null) => Err(PayloadError::MissingField { field }),
        Some(Value::String(s)) if s.is_empty() => Err(PayloadError::MissingField { field }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(PayloadError::NotAString { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_document() -> Document {
        Document::new("doc-1")
            .with_field(FIELD_PKG, "com.example.foo")
            .with_field(FIELD_FILE, "FooTest.java")
            .with_field(FIELD_CODE, "class FooTest {}")
    }

    #[test]
    fn test_complete_document_yields_payload() {
        let payload = TestPayload::from_document(&complete_document()).unwrap();
        assert_eq!(payload.package, "com.example.foo");
        assert_eq!(payload.filename, "FooTest.java");
        assert_eq!(payload.content, "class FooTest {}");
    }

    #[test]
    fn test_each_field_is_required() {
        for field in [FIELD_PKG, FIELD_FILE, FIELD_CODE] {
            let mut doc = complete_document();
            doc.fields.remove(field);
            assert_eq!(
                TestPayload::from_document(&doc),
                Err(PayloadError::MissingField { field }),
            );
        }
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let doc = complete_document().with_field(FIELD_CODE, "");
        assert_eq!(
            TestPayload::from_document(&doc),
            Err(PayloadError::MissingField { field: FIELD_CODE }),
        );
    }

    #[test]
    fn test_null_counts_as_missing() {
        let doc = complete_document().with_field(FIELD_PKG, Value::Null);
        assert_eq!(
            TestPayload::from_document(&doc),
            Err(PayloadError::MissingField { field: FIELD_PKG }),
        );
    }

    #[test]
    fn test_non_string_field_is_rejected() {
        let doc = complete_document().with_field(FIELD_FILE, 7);
        assert_eq!(
            TestPayload::from_document(&doc),
            Err(PayloadError::NotAString { field: FIELD_FILE }),
        );
    }

    #[test]
    fn test_payload_error_display() {
        insta::assert_snapshot!(
            PayloadError::MissingField { field: FIELD_PKG },
            @"missing or empty field 'pkg'"
        );
    }
}
