//! Error types for the qab-feed crate.
//!
//! This module provides the [`FeedError`] type for errors that can occur
//! while subscribing to and consuming a change feed.

use camino::Utf8PathBuf;

/// Errors that can occur during feed subscription and delivery.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`FeedError::Notify`]): Fatal - propagate immediately
/// - **Spool not found** ([`FeedError::SpoolNotFound`]): Fatal - the spool must exist
/// - **Channel closed** ([`FeedError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`FeedError::NonUtf8Path`]): Recoverable - skip and continue
/// - **Decode failures** ([`FeedError::Decode`]): Recoverable - that document is skipped
/// - **I/O errors** ([`FeedError::Io`]): Fatal - propagate immediately
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Failed to initialize or operate the notify watcher behind the spool.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The spool directory does not exist.
    #[error("spool directory does not exist: {0}")]
    SpoolNotFound(Utf8PathBuf),

    /// The batch channel was closed unexpectedly.
    ///
    /// This indicates a communication failure between the delivery context
    /// and the async consumer.
    #[error("batch channel closed unexpectedly")]
    ChannelClosed,

    /// A spool path is not valid UTF-8.
    ///
    /// This crate uses UTF-8 paths throughout. Non-UTF-8 spool entries are
    /// logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A spool entry could not be decoded into a document.
    #[error("failed to decode document '{path}': {source}")]
    Decode {
        /// The spool entry that failed to decode.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Creates a new [`FeedError::SpoolNotFound`] error.
    #[inline]
    pub fn spool_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::SpoolNotFound(path.into())
    }

    /// Creates a new [`FeedError::Decode`] error.
    #[inline]
    pub fn decode(path: impl Into<Utf8PathBuf>, source: serde_json::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (delivery can continue).
    ///
    /// Recoverable errors are document-specific issues; the offending entry
    /// is skipped and the subscription stays alive.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_) | Self::Decode { .. })
    }

    /// Returns `true` if this error is fatal (the subscription should end).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}
