//! Change feed subscription with async batch delivery.
//!
//! This crate provides the feed side of the qa-bridge pipeline: a
//! [`ChangeFeed`] hands out [`FeedSubscription`]s that stream
//! [`ChangeBatch`]es of document changes into an async consumer, plus the
//! credential resolution the supervisor performs before subscribing.
//!
//! # Overview
//!
//! - [`SpoolFeed`] - the local transport: a spool directory of JSON
//!   documents, watched via `notify` with debouncing, delivering an initial
//!   sync of all existing documents followed by live changes.
//! - [`MemoryFeed`] - an in-process feed for tests.
//! - [`CredentialMode`] / [`AuthContext`] - explicit or ambient credential
//!   resolution, fatal at startup when an explicitly configured file is
//!   unusable.
//!
//! # Crate Dependencies
//!
//! ```text
//! qab-cli ──► qab-sink ──► qab-feed ──► qab-core
//!         └──────────────────────────────────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use qab_feed::{ChangeFeed, SpoolFeed};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = SpoolFeed::new("qa-spool", 100);
//!     let mut subscription = feed.subscribe("generated_tests").await?;
//!
//!     // Initial sync arrives first, then live updates
//!     while let Some(batch) = subscription.recv().await {
//!         println!("received {} change(s)", batch.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod credentials;
pub mod error;
pub mod events;
pub mod feed;
pub mod memory;
pub mod spool;

// Re-export error types
pub use error::FeedError;

// Re-export event types
pub use events::{ChangeBatch, ChangeBatchStats, ChangeEvent, ChangeKind};

// Re-export feed types
pub use feed::{ChangeFeed, FeedSubscription};
pub use memory::MemoryFeed;
pub use spool::SpoolFeed;

// Re-export credential types
pub use credentials::{
    AMBIENT_CREDENTIALS_ENV, AuthContext, AuthError, CREDENTIALS_ENV, CredentialMode,
    ServiceAccountKey,
};
