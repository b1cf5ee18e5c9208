//! Error types for the qab-sink crate.

use camino::Utf8PathBuf;

/// Errors that can occur while materializing a payload to disk.
///
/// Every variant names the path (or component) involved so per-document
/// diagnostics stay actionable without a debugger.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// A package segment or filename is not a legal target name.
    ///
    /// Empty segments, `.`, `..`, absolute components, and components
    /// containing a path separator are rejected before any filesystem
    /// contact, closing the traversal hole a raw join would open.
    #[error("unsafe path component '{component}'")]
    UnsafeComponent {
        /// The offending component.
        component: String,
    },

    /// Creating the target directory (or an ancestor) failed.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// The directory being created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the content to the temporary file failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// The target path being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Renaming the temporary file over the target failed.
    #[error("failed to replace '{path}': {source}")]
    Persist {
        /// The target path being replaced.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    /// Creates a new [`MaterializeError::UnsafeComponent`] error.
    #[inline]
    pub fn unsafe_component(component: impl Into<String>) -> Self {
        Self::UnsafeComponent {
            component: component.into(),
        }
    }

    /// Returns `true` if the failure was a rejected path component rather
    /// than an I/O problem.
    #[inline]
    #[must_use]
    pub const fn is_unsafe_component(&self) -> bool {
        matches!(self, Self::UnsafeComponent { .. })
    }
}
