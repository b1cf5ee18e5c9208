//! Change classification and crash-safe file materialization.
//!
//! This crate is the write side of the qa-bridge pipeline. A delivered
//! [`ChangeBatch`](qab_feed::ChangeBatch) flows through:
//!
//! 1. [`classify()`] - keep only `Added` events carrying a complete
//!    `{pkg, file, code}` payload; everything else becomes a recorded skip.
//! 2. [`Materializer`] - idempotent, crash-safe write of the payload to
//!    `root / package-segments / filename`.
//! 3. [`Dispatcher`] - the per-batch loop tying the two together with
//!    per-event failure isolation: no retry, no dead-letter, no batch abort.
//!
//! # Failure policy
//!
//! Each delivery is attempted exactly once, best-effort. Every per-document
//! problem - a missing field, an unsafe path component, a failed write - is
//! contained at the dispatch boundary and reported as a
//! [`DispatchOutcome`]; it never reaches the feed subscription.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod classify;
pub mod dispatch;
pub mod error;
pub mod materializer;

// Re-export error types
pub use error::MaterializeError;

// Re-export classification types
pub use classify::{Classification, SkipReason, classify};

// Re-export materializer types
pub use materializer::Materializer;

// Re-export dispatch types
pub use dispatch::{DispatchOutcome, DispatchReport, Dispatcher};
