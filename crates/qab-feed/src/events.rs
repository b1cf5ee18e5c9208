//! Change event types delivered by a feed subscription.
//!
//! # Event Flow
//!
//! ```text
//! Remote collection change
//!        │
//!        ▼
//! ChangeEvent created (Added / Modified / Removed)
//!        │
//!        ▼
//! Batched into a ChangeBatch
//!        │
//!        ▼
//! Sent via channel to the dispatcher
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use qab_core::Document;

/// The kind of change a feed delivery describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The document is new to the collection (or part of the initial sync).
    Added,
    /// An existing document's fields changed.
    Modified,
    /// The document was removed from the collection.
    Removed,
}

impl ChangeKind {
    /// Returns a short lowercase label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One notification from the feed: a change kind plus the document involved.
///
/// Events are transient - created by the feed per change, consumed once by
/// the dispatcher, not persisted.
///
/// # Examples
///
/// ```
/// use qab_core::Document;
/// use qab_feed::{ChangeEvent, ChangeKind};
///
/// let event = ChangeEvent::added(Document::new("doc-1"));
/// assert_eq!(event.kind, ChangeKind::Added);
/// assert!(event.is_added());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened to the document.
    pub kind: ChangeKind,

    /// The document as delivered. For removals the field map is empty.
    pub document: Document,
}

impl ChangeEvent {
    /// Creates a new change event.
    #[inline]
    #[must_use]
    pub const fn new(kind: ChangeKind, document: Document) -> Self {
        Self { kind, document }
    }

    /// Creates an `Added` event.
    #[inline]
    #[must_use]
    pub const fn added(document: Document) -> Self {
        Self::new(ChangeKind::Added, document)
    }

    /// Creates a `Modified` event.
    #[inline]
    #[must_use]
    pub const fn modified(document: Document) -> Self {
        Self::new(ChangeKind::Modified, document)
    }

    /// Creates a `Removed` event.
    #[inline]
    #[must_use]
    pub const fn removed(document: Document) -> Self {
        Self::new(ChangeKind::Removed, document)
    }

    /// Returns `true` for `Added` events, the only kind that is materialized.
    #[inline]
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self.kind, ChangeKind::Added)
    }
}

/// An ordered batch of change events received together.
///
/// A batch corresponds to one delivery from the feed; events are processed
/// in the order they appear here.
///
/// # Memory Efficiency
///
/// Uses [`SmallVec`] with inline storage for up to 8 events, avoiding heap
/// allocation in the common case of small deliveries.
///
/// # Examples
///
/// ```
/// use qab_core::Document;
/// use qab_feed::{ChangeBatch, ChangeEvent};
///
/// let mut batch = ChangeBatch::new();
/// batch.push(ChangeEvent::added(Document::new("a")));
/// batch.push(ChangeEvent::removed(Document::new("b")));
///
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch.added_events().count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    /// The events in this batch, in delivery order.
    pub events: SmallVec<[ChangeEvent; 8]>,

    /// The timestamp when this batch was created.
    pub received_at: Instant,
}

impl ChangeBatch {
    /// Creates a new empty batch stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: SmallVec::new(),
            received_at: Instant::now(),
        }
    }

    /// Creates a batch from an iterator of events.
    #[inline]
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = ChangeEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            received_at: Instant::now(),
        }
    }

    /// Adds an event to the batch.
    #[inline]
    pub fn push(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Returns the number of events in this batch.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the batch contains no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns an iterator over the events in delivery order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.events.iter()
    }

    /// Returns an iterator over `Added` events only.
    #[inline]
    pub fn added_events(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.events.iter().filter(|e| e.is_added())
    }
}

impl Default for ChangeBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for ChangeBatch {
    type Item = ChangeEvent;
    type IntoIter = smallvec::IntoIter<[ChangeEvent; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeBatch {
    type Item = &'a ChangeEvent;
    type IntoIter = std::slice::Iter<'a, ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<ChangeEvent> for ChangeBatch {
    fn from_iter<T: IntoIterator<Item = ChangeEvent>>(iter: T) -> Self {
        Self::from_events(iter)
    }
}

/// Summary statistics for a batch of change events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchStats {
    /// Total number of events in the batch.
    pub total_events: usize,

    /// Number of `Added` events.
    pub added: usize,

    /// Number of `Modified` events.
    pub modified: usize,

    /// Number of `Removed` events.
    pub removed: usize,
}

impl ChangeBatchStats {
    /// Computes statistics for a batch.
    #[must_use]
    pub fn from_batch(batch: &ChangeBatch) -> Self {
        let mut stats = Self {
            total_events: batch.len(),
            ..Self::default()
        };
        for event in batch {
            match event.kind {
                ChangeKind::Added => stats.added += 1,
                ChangeKind::Modified => stats.modified += 1,
                ChangeKind::Removed => stats.removed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_labels() {
        assert_eq!(ChangeKind::Added.label(), "added");
        assert_eq!(ChangeKind::Modified.label(), "modified");
        assert_eq!(ChangeKind::Removed.label(), "removed");
    }

    #[test]
    fn test_change_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Added).unwrap(),
            r#""added""#
        );
        assert_eq!(
            serde_json::to_string(&ChangeKind::Removed).unwrap(),
            r#""removed""#
        );
    }

    #[test]
    fn test_event_constructors() {
        let added = ChangeEvent::added(Document::new("a"));
        assert!(added.is_added());

        let modified = ChangeEvent::modified(Document::new("b"));
        assert!(!modified.is_added());
        assert_eq!(modified.kind, ChangeKind::Modified);
    }

    #[test]
    fn test_batch_push_and_len() {
        let mut batch = ChangeBatch::new();
        assert!(batch.is_empty());

        batch.push(ChangeEvent::added(Document::new("a")));
        batch.push(ChangeEvent::modified(Document::new("b")));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_batch_preserves_delivery_order() {
        let batch: ChangeBatch = ["a", "b", "c"]
            .into_iter()
            .map(|id| ChangeEvent::added(Document::new(id)))
            .collect();

        let ids: Vec<_> = batch.iter().map(|e| e.document.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_batch_added_events_filter() {
        let mut batch = ChangeBatch::new();
        batch.push(ChangeEvent::added(Document::new("a")));
        batch.push(ChangeEvent::removed(Document::new("b")));
        batch.push(ChangeEvent::added(Document::new("c")));

        assert_eq!(batch.added_events().count(), 2);
    }

    #[test]
    fn test_batch_into_iter() {
        let mut batch = ChangeBatch::new();
        batch.push(ChangeEvent::added(Document::new("a")));
        let events: Vec<_> = batch.into_iter().collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_batch_stats() {
        let mut batch = ChangeBatch::new();
        batch.push(ChangeEvent::added(Document::new("a")));
        batch.push(ChangeEvent::added(Document::new("b")));
        batch.push(ChangeEvent::modified(Document::new("c")));
        batch.push(ChangeEvent::removed(Document::new("d")));

        let stats = ChangeBatchStats::from_batch(&batch);
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.added, 2);
        assert_eq!(stats.modified, 1);
        assert_eq!(stats.removed, 1);
    }
}
