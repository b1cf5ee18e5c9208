//! Change classification and payload validation.
//!
//! Every delivered event passes through [`classify()`] before anything touches
//! the filesystem. Only `Added` events with a complete `{pkg, file, code}`
//! field map come out as [`Classification::Materialize`]; everything else is
//! a [`Classification::Skip`] carrying the document id and the reason, so the
//! dispatcher can log it and move on.

use qab_core::{DocumentId, PayloadError, TestPayload};
use qab_feed::{ChangeEvent, ChangeKind};

/// Why an event was not materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The change kind is not `Added`; modifications and removals are never
    /// propagated to the filesystem.
    IgnoredKind(ChangeKind),

    /// The document is missing one of the required fields.
    InvalidPayload(PayloadError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IgnoredKind(kind) => write!(f, "change kind '{kind}' is not materialized"),
            Self::InvalidPayload(error) => error.fmt(f),
        }
    }
}

/// The result of classifying one change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The event carries a complete payload and should be written.
    Materialize(TestPayload),

    /// The event is dropped; nothing is written or deleted.
    Skip {
        /// The document the event was about.
        document_id: DocumentId,
        /// Why the event was dropped.
        reason: SkipReason,
    },
}

/// Classifies a change event into a materialization decision.
///
/// # Examples
///
/// ```
/// use qab_core::Document;
/// use qab_feed::ChangeEvent;
/// use qab_sink::{Classification, classify};
///
/// let doc = Document::new("doc-1")
///     .with_field("pkg", "com.example")
///     .with_field("file", "FooTest.java")
///     .with_field("code", "class FooTest {}");
///
/// match classify(&ChangeEvent::added(doc)) {
///     Classification::Materialize(payload) => assert_eq!(payload.package, "com.example"),
///     Classification::Skip { .. } => panic!("complete documents are materialized"),
/// }
/// ```
#[must_use]
pub fn classify(event: &ChangeEvent) -> Classification {
    if !event.is_added() {
        return Classification::Skip {
            document_id: event.document.id.clone(),
            reason: SkipReason::IgnoredKind(event.kind),
        };
    }

    match TestPayload::from_document(&event.document) {
        Ok(payload) => Classification::Materialize(payload),
        Err(error) => Classification::Skip {
            document_id: event.document.id.clone(),
            reason: SkipReason::InvalidPayload(error),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qab_core::Document;

    fn complete_document(id: &str) -> Document {
        Document::new(id)
            .with_field("pkg", "com.example.foo")
            .with_field("file", "FooTest.java")
            .with_field("code", "class FooTest {}")
    }

    #[test]
    fn test_added_complete_document_is_materialized() {
        let event = ChangeEvent::added(complete_document("doc-1"));
        match classify(&event) {
            Classification::Materialize(payload) => {
                assert_eq!(payload.filename, "FooTest.java");
            }
            Classification::Skip { .. } => panic!("expected Materialize"),
        }
    }

    #[test]
    fn test_modified_and_removed_are_skipped() {
        for event in [
            ChangeEvent::modified(complete_document("doc-1")),
            ChangeEvent::removed(Document::new("doc-2")),
        ] {
            match classify(&event) {
                Classification::Skip { reason, .. } => {
                    assert_eq!(reason, SkipReason::IgnoredKind(event.kind));
                }
                Classification::Materialize(_) => panic!("expected Skip for {}", event.kind),
            }
        }
    }

    #[test]
    fn test_incomplete_document_is_skipped_with_id() {
        let mut doc = complete_document("doc-3");
        doc.fields.remove("code");

        match classify(&ChangeEvent::added(doc)) {
            Classification::Skip {
                document_id,
                reason,
            } => {
                assert_eq!(document_id.as_str(), "doc-3");
                assert_eq!(
                    reason,
                    SkipReason::InvalidPayload(PayloadError::MissingField { field: "code" })
                );
            }
            Classification::Materialize(_) => panic!("expected Skip"),
        }
    }

    #[test]
    fn test_skip_reason_display() {
        insta::assert_snapshot!(
            SkipReason::IgnoredKind(ChangeKind::Modified),
            @"change kind 'modified' is not materialized"
        );
        insta::assert_snapshot!(
            SkipReason::InvalidPayload(PayloadError::MissingField { field: "pkg" }),
            @"missing or empty field 'pkg'"
        );
    }
}
