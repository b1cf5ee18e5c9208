//! Core types, errors, and utilities for the qa-bridge workspace.
//!
//! This crate provides the foundational pieces used across the workspace:
//!
//! - Error types for consistent error handling
//! - Configuration structures for the feed and the output tree
//! - Domain types (`Document`, `DocumentId`, `TestPayload`)
//! - The package-to-path mapper
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod pathmap;
pub mod types;

// Re-export configuration types
pub use config::{BridgeConfig, FeedConfig, OutputConfig};

// Re-export error types
pub use error::ConfigError;

// Re-export hash aliases
pub use hash::{FxBuildHasher, FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};

// Re-export domain types
pub use types::{Document, DocumentId, PayloadError, TestPayload};
