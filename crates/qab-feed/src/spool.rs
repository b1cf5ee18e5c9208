//! Local spool directory feed.
//!
//! The spool is the local transport for a remote collection: each document is
//! one JSON file (`<document-id>.json`) holding the flat field map. Dropping
//! a file into the spool is a document creation, rewriting it is a
//! modification, deleting it is a removal.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────┐   ┌────────────────┐   ┌───────────────────┐ │
//! │  │ Initial sync │ → │ RecommendedWatcher + Debouncer          │ │
//! │  │ (walk spool) │   │ (notify)       │ → │ decode + classify │ │
//! │  └──────────────┘   └────────────────┘   └─────────┬─────────┘ │
//! └────────────────────────────────────────────────────│───────────┘
//!                                        blocking_send │
//!                                                      ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ FeedSubscription │    │ mpsc::Receiver │ → dispatcher        │
//! │  │ (shutdown ctrl)  │    │ (batches)      │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Replay on restart
//!
//! Every subscription begins with an initial sync: all documents already in
//! the spool are delivered again as one `Added` batch. A restarted bridge
//! therefore rewrites every historical file. This is the standard change-feed
//! contract, and it is harmless because materialization is idempotent.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use qab_core::{Document, FxHashSet};

use crate::error::FeedError;
use crate::events::{ChangeBatch, ChangeEvent, ChangeKind};
use crate::feed::{ChangeFeed, DEFAULT_CHANNEL_CAPACITY, FeedSubscription};

/// Spool entries must carry this extension to be treated as documents.
const DOCUMENT_EXTENSION: &str = "json";

/// A change feed backed by a local spool directory.
///
/// # Examples
///
/// ```no_run
/// use qab_feed::{ChangeFeed, SpoolFeed};
///
/// # async fn example() -> Result<(), qab_feed::FeedError> {
/// let feed = SpoolFeed::new("qa-spool", 100);
/// let mut subscription = feed.subscribe("generated_tests").await?;
///
/// while let Some(batch) = subscription.recv().await {
///     println!("received {} change(s)", batch.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SpoolFeed {
    /// The spool directory holding one JSON file per document.
    spool_dir: Utf8PathBuf,

    /// Debounce window for coalescing rapid spool writes.
    debounce_ms: u64,

    /// Capacity of the batch delivery channel.
    channel_capacity: usize,
}

impl SpoolFeed {
    /// Creates a spool feed over the given directory.
    ///
    /// The directory must exist by the time [`subscribe`](ChangeFeed::subscribe)
    /// is called.
    #[must_use]
    pub fn new(spool_dir: impl Into<Utf8PathBuf>, debounce_ms: u64) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            debounce_ms,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Overrides the delivery channel capacity.
    ///
    /// Use this when bursts of spool changes are expected and the consumer
    /// may lag behind.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Returns the spool directory.
    #[must_use]
    pub fn spool_dir(&self) -> &Utf8Path {
        &self.spool_dir
    }
}

impl ChangeFeed for SpoolFeed {
    #[allow(clippy::unused_async)] // Async per the trait contract; setup is sync
    async fn subscribe(&self, collection: &str) -> Result<FeedSubscription, FeedError> {
        // Validate the spool exists
        if !self.spool_dir.exists() {
            return Err(FeedError::spool_not_found(&self.spool_dir));
        }

        // Canonicalize to get an absolute path
        let spool = self.spool_dir.canonicalize_utf8().map_err(FeedError::Io)?;

        // Create channels
        let (batch_tx, batch_rx) = mpsc::channel(self.channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Clone values for the blocking task
        let debounce_ms = self.debounce_ms;
        let task_collection = collection.to_owned();

        // Spawn blocking task for notify
        let task_handle = tokio::task::spawn_blocking(move || {
            run_spool_loop(spool, debounce_ms, batch_tx, shutdown_rx, &task_collection)
        });

        Ok(FeedSubscription::from_parts(
            batch_rx,
            Some(shutdown_tx),
            Some(task_handle),
            collection,
        ))
    }
}

/// Runs the spool delivery loop in a blocking context.
///
/// Performs the initial sync, then forwards debounced spool changes as
/// batches until the shutdown signal arrives.
#[allow(clippy::needless_pass_by_value)] // Path must be owned for the blocking task lifetime
fn run_spool_loop(
    spool: Utf8PathBuf,
    debounce_ms: u64,
    batch_tx: mpsc::Sender<ChangeBatch>,
    shutdown_rx: oneshot::Receiver<()>,
    collection: &str,
) -> Result<(), FeedError> {
    let seen = Arc::new(Mutex::new(FxHashSet::default()));

    // Initial sync: replay every document already in the spool as Added.
    let initial = initial_sync(&spool, &seen);
    if !initial.is_empty() {
        tracing::info!(
            collection = %collection,
            documents = initial.len(),
            "delivering initial sync batch"
        );
        if batch_tx.blocking_send(initial).is_err() {
            tracing::debug!("batch channel closed before initial sync");
            return Ok(());
        }
    }

    let timeout = Duration::from_millis(debounce_ms);

    // Create the debouncer with a callback that decodes and sends batches
    let tx = batch_tx;
    let callback_seen = Arc::clone(&seen);
    let debouncer_result: Result<Debouncer<notify::RecommendedWatcher>, notify::Error> =
        new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let mut batch = ChangeBatch::new();
                for event in events {
                    if let Some(change) = spool_event(event.path, &callback_seen) {
                        batch.push(change);
                    }
                }
                if !batch.is_empty() && tx.blocking_send(batch).is_err() {
                    tracing::debug!("batch channel closed, stopping spool feed");
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "debouncer error");
            }
        });

    let mut debouncer = debouncer_result?;

    // Documents live flat in the spool; nothing below it is watched.
    debouncer
        .watcher()
        .watch(spool.as_std_path(), RecursiveMode::NonRecursive)?;

    tracing::info!(spool = %spool, collection = %collection, "spool feed watching");

    // Block until shutdown signal is received
    let _ = shutdown_rx.blocking_recv();

    tracing::info!(spool = %spool, "spool feed stopped");

    Ok(())
}

/// Walks the spool and builds the initial `Added` batch.
///
/// Every decoded document is marked seen so later watcher events for it
/// classify as modifications.
fn initial_sync(spool: &Utf8Path, seen: &Mutex<FxHashSet<String>>) -> ChangeBatch {
    let mut batch = ChangeBatch::new();

    let walker = WalkBuilder::new(spool)
        // Enable standard filters (.gitignore, .ignore, hidden files)
        .standard_filters(true)
        // The spool is flat; don't descend
        .max_depth(Some(1))
        .threads(1)
        // Don't require the spool to be a git repo
        .require_git(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(error = %error, "skipping unreadable spool entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = match Utf8PathBuf::try_from(entry.into_path()) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    path = %e.into_path_buf().display(),
                    "skipping non-UTF-8 spool entry"
                );
                continue;
            }
        };

        if !is_document_path(&path) {
            continue;
        }

        match read_document(&path) {
            Ok(document) => {
                seen.lock().insert(document.id.as_str().to_owned());
                batch.push(ChangeEvent::added(document));
            }
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "skipping undecodable spool entry");
            }
        }
    }

    batch
}

/// Converts one debounced spool event into a change event, if it maps to a
/// document.
///
/// A path that still exists is decoded and classified against the seen-set
/// (first sighting is `Added`, re-sighting is `Modified`); a vanished path
/// for a known document becomes `Removed`.
fn spool_event(path: std::path::PathBuf, seen: &Mutex<FxHashSet<String>>) -> Option<ChangeEvent> {
    // Convert PathBuf to Utf8PathBuf
    let path = match Utf8PathBuf::try_from(path) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                path = %e.into_path_buf().display(),
                "skipping non-UTF-8 path in spool event"
            );
            return None;
        }
    };

    if !is_document_path(&path) {
        tracing::trace!(path = %path, "ignoring non-document spool entry");
        return None;
    }

    if path.exists() {
        match read_document(&path) {
            Ok(document) => {
                let first_sighting = seen.lock().insert(document.id.as_str().to_owned());
                let kind = if first_sighting {
                    ChangeKind::Added
                } else {
                    ChangeKind::Modified
                };
                Some(ChangeEvent::new(kind, document))
            }
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "skipping undecodable spool entry");
                None
            }
        }
    } else {
        let id = document_id(&path)?;
        let was_known = seen.lock().remove(&id);
        was_known.then(|| ChangeEvent::removed(Document::new(id)))
    }
}

/// Returns `true` if the path looks like a spool document.
fn is_document_path(path: &Utf8Path) -> bool {
    path.extension().is_some_and(|ext| ext == DOCUMENT_EXTENSION)
}

/// Derives the document id from a spool path (the file stem).
fn document_id(path: &Utf8Path) -> Option<String> {
    path.file_stem().map(str::to_owned)
}

/// Reads and decodes one spool document.
fn read_document(path: &Utf8Path) -> Result<Document, FeedError> {
    let raw = std::fs::read_to_string(path)?;
    let fields: qab_core::FxHashMap<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(|source| FeedError::decode(path, source))?;
    let id = path.file_stem().unwrap_or(path.as_str());
    Ok(Document::with_fields(id, fields))
}
