//! Domain types shared across the qa-bridge workspace.
//!
//! This module provides the types flowing through the bridge pipeline:
//!
//! - [`Document`] / [`DocumentId`] - a remote record with a flat field map
//! - [`TestPayload`] - the validated triple extracted from a document
//! - [`PayloadError`] - why a document failed to yield a payload

mod document;
mod payload;

pub use document::{Document, DocumentId};
pub use payload::{FIELD_CODE, FIELD_FILE, FIELD_PKG, PayloadError, TestPayload};
