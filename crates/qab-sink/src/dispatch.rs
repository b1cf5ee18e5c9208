//! Per-batch dispatch with per-event failure isolation.
//!
//! The dispatcher is the boundary where everything per-document is caught:
//! a skip, a rejected path, or a failed write is recorded and logged, and the
//! batch simply continues. Nothing here ever propagates an error back to the
//! feed subscription - one poisoned document can never stall the pipeline.
//!
//! Dispatching a batch is a pure fold over its events into a list of
//! [`DispatchOutcome`]s; the only side effect is the materializer's write.
//! That keeps the whole decision path unit-testable without a live feed.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use qab_core::DocumentId;
use qab_feed::{ChangeBatch, ChangeEvent};

use crate::classify::{Classification, SkipReason, classify};
use crate::error::MaterializeError;
use crate::materializer::Materializer;

/// What happened to one event of a dispatched batch.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The payload was materialized at the given absolute path.
    Written {
        /// The document the payload came from.
        document_id: DocumentId,
        /// The absolute path written.
        path: Utf8PathBuf,
    },

    /// The event was dropped before touching the filesystem.
    Skipped {
        /// The document the event was about.
        document_id: DocumentId,
        /// Why it was dropped.
        reason: SkipReason,
    },

    /// The write was attempted and failed; later events still ran.
    Failed {
        /// The document the payload came from.
        document_id: DocumentId,
        /// The filename that failed to materialize.
        filename: String,
        /// The materialization failure.
        error: MaterializeError,
    },
}

impl DispatchOutcome {
    /// Returns `true` if this outcome is a successful write.
    #[inline]
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// Returns `true` if this outcome is a failed write.
    #[inline]
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Counts summarizing one dispatched batch.
///
/// # Examples
///
/// ```
/// use qab_sink::DispatchReport;
///
/// let report = DispatchReport {
///     written: 3,
///     skipped: 1,
///     failed: 0,
/// };
/// assert_eq!(report.to_string(), "3 written, 1 skipped, 0 failed");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Number of payloads written.
    pub written: usize,

    /// Number of events dropped before the filesystem.
    pub skipped: usize,

    /// Number of failed writes.
    pub failed: usize,
}

impl DispatchReport {
    /// Summarizes a list of outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: &[DispatchOutcome]) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                DispatchOutcome::Written { .. } => report.written += 1,
                DispatchOutcome::Skipped { .. } => report.skipped += 1,
                DispatchOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report
    }
}

impl std::fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} failed",
            self.written, self.skipped, self.failed
        )
    }
}

/// Processes change batches into filesystem writes.
///
/// # Thread Safety
///
/// The dispatcher is stateless apart from its configuration; it is safe to
/// dispatch overlapping batches from concurrent contexts. Outcomes within
/// one batch follow delivery order.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// The materializer performing the writes.
    materializer: Materializer,

    /// Base stripped from written paths in log lines, for readability.
    display_base: Option<Utf8PathBuf>,
}

impl Dispatcher {
    /// Creates a dispatcher writing through the given materializer.
    #[must_use]
    pub fn new(materializer: Materializer) -> Self {
        Self {
            materializer,
            display_base: None,
        }
    }

    /// Logs written paths relative to this base (typically the project
    /// root).
    #[must_use]
    pub fn with_display_base(mut self, base: impl Into<Utf8PathBuf>) -> Self {
        self.display_base = Some(base.into());
        self
    }

    /// Returns the materializer.
    #[must_use]
    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    /// Dispatches one batch, event by event, in delivery order.
    ///
    /// Never fails as a whole: each event yields exactly one outcome and a
    /// bad document only affects itself.
    pub fn dispatch(&self, batch: &ChangeBatch) -> Vec<DispatchOutcome> {
        batch.iter().map(|event| self.dispatch_event(event)).collect()
    }

    /// Classifies and, when warranted, materializes a single event.
    fn dispatch_event(&self, event: &ChangeEvent) -> DispatchOutcome {
        match classify(event) {
            Classification::Skip {
                document_id,
                reason,
            } => {
                match &reason {
                    SkipReason::IgnoredKind(kind) => {
                        tracing::debug!(document = %document_id, kind = %kind, "ignoring change");
                    }
                    SkipReason::InvalidPayload(error) => {
                        tracing::warn!(document = %document_id, reason = %error, "skipping document");
                    }
                }
                DispatchOutcome::Skipped {
                    document_id,
                    reason,
                }
            }
            Classification::Materialize(payload) => match self.materializer.write(&payload) {
                Ok(path) => {
                    tracing::info!(
                        document = %event.document.id,
                        path = %self.display_path(&path),
                        "materialized test file"
                    );
                    DispatchOutcome::Written {
                        document_id: event.document.id.clone(),
                        path,
                    }
                }
                Err(error) => {
                    tracing::error!(
                        document = %event.document.id,
                        file = %payload.filename,
                        error = %error,
                        "failed to materialize test file"
                    );
                    DispatchOutcome::Failed {
                        document_id: event.document.id.clone(),
                        filename: payload.filename,
                        error,
                    }
                }
            },
        }
    }

    /// Relativizes a written path for log output.
    fn display_path<'a>(&self, path: &'a Utf8Path) -> &'a Utf8Path {
        match &self.display_base {
            Some(base) => path.strip_prefix(base).unwrap_or(path),
            None => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use qab_core::Document;
    use qab_feed::ChangeEvent;
    use tempfile::TempDir;

    fn temp_dispatcher() -> (TempDir, Dispatcher) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, Dispatcher::new(Materializer::new(root)))
    }

    fn complete_document(id: &str, pkg: &str, file: &str) -> Document {
        Document::new(id)
            .with_field("pkg", pkg)
            .with_field("file", file)
            .with_field("code", format!("// {id}"))
    }

    #[test]
    fn test_batch_with_invalid_event_still_writes_valid_one() {
        let (_guard, dispatcher) = temp_dispatcher();

        let incomplete = Document::new("bad").with_field("pkg", "com.example");
        let batch = ChangeBatch::from_events([
            ChangeEvent::added(incomplete),
            ChangeEvent::added(complete_document("good", "com.example", "Good.java")),
        ]);

        let outcomes = dispatcher.dispatch(&batch);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], DispatchOutcome::Skipped { .. }));
        assert!(outcomes[1].is_written());

        let report = DispatchReport::from_outcomes(&outcomes);
        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_failing_write_does_not_stop_the_batch() {
        let (_guard, dispatcher) = temp_dispatcher();

        let batch = ChangeBatch::from_events([
            ChangeEvent::added(complete_document("escape", "..", "Escape.java")),
            ChangeEvent::added(complete_document("ok", "com.example", "Ok.java")),
        ]);

        let outcomes = dispatcher.dispatch(&batch);
        assert!(outcomes[0].is_failed());
        assert!(outcomes[1].is_written());
    }

    #[test]
    fn test_modified_and_removed_never_write() {
        let (guard, dispatcher) = temp_dispatcher();

        let batch = ChangeBatch::from_events([
            ChangeEvent::modified(complete_document("m", "com.example", "M.java")),
            ChangeEvent::removed(Document::new("r")),
        ]);

        let outcomes = dispatcher.dispatch(&batch);
        assert!(outcomes.iter().all(|o| !o.is_written()));
        let entries = std::fs::read_dir(guard.path()).expect("read dir").count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn test_outcomes_follow_delivery_order() {
        let (_guard, dispatcher) = temp_dispatcher();

        let batch = ChangeBatch::from_events([
            ChangeEvent::added(complete_document("first", "a", "First.java")),
            ChangeEvent::added(complete_document("second", "b", "Second.java")),
        ]);

        let outcomes = dispatcher.dispatch(&batch);
        match (&outcomes[0], &outcomes[1]) {
            (
                DispatchOutcome::Written { document_id: a, .. },
                DispatchOutcome::Written { document_id: b, .. },
            ) => {
                assert_eq!(a.as_str(), "first");
                assert_eq!(b.as_str(), "second");
            }
            other => panic!("expected two writes, got {other:?}"),
        }
    }

    #[test]
    fn test_display_base_relativizes_logged_paths() {
        let (_guard, dispatcher) = temp_dispatcher();
        let root = dispatcher.materializer().root().to_owned();
        let dispatcher = dispatcher.with_display_base(root.clone());

        let joined = root.join("com/T.java");
        let stripped = dispatcher.display_path(&joined);
        assert_eq!(stripped, Utf8Path::new("com/T.java"));

        // Paths outside the base are shown as-is
        let outside = dispatcher.display_path(Utf8Path::new("/elsewhere/T.java"));
        assert_eq!(outside, Utf8Path::new("/elsewhere/T.java"));
    }

    #[test]
    fn test_report_display() {
        let report = DispatchReport {
            written: 2,
            skipped: 1,
            failed: 1,
        };
        insta::assert_snapshot!(report, @"2 written, 1 skipped, 1 failed");
    }
}
