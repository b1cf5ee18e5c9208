//! Configuration structures for the qa-bridge tool.
//!
//! This module provides configuration types for all components of the
//! application:
//!
//! - [`FeedConfig`] - Change feed settings (collection, spool path, debounce)
//! - [`OutputConfig`] - Output tree settings (project root, test directory)
//! - [`BridgeConfig`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with the values the original
//! Magic QA project layout expects.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Configuration for the change feed subscription.
///
/// Controls which collection is consumed and how the local spool transport
/// detects changes.
///
/// # Examples
///
/// ```
/// use qab_core::FeedConfig;
///
/// let config = FeedConfig::default();
/// assert_eq!(config.collection, "generated_tests");
/// assert_eq!(config.debounce_ms, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Name of the remote collection to subscribe to.
    pub collection: String,

    /// Spool directory holding one JSON file per document.
    ///
    /// Relative paths are resolved against the project root.
    pub spool_dir: Utf8PathBuf,

    /// Debounce window in milliseconds.
    ///
    /// Multiple spool changes within this window are batched into a single
    /// delivery.
    pub debounce_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            collection: "generated_tests".to_owned(),
            spool_dir: Utf8PathBuf::from("qa-spool"),
            debounce_ms: 100,
        }
    }
}

/// Configuration for the materialized output tree.
///
/// The output root is always an explicit value threaded through every
/// component so tests can redirect writes to an isolated temporary root.
///
/// # Examples
///
/// ```
/// use qab_core::OutputConfig;
/// use camino::Utf8PathBuf;
///
/// let config = OutputConfig {
///     project_root: Utf8PathBuf::from("/work/project"),
///     ..OutputConfig::default()
/// };
/// assert_eq!(
///     config.output_root().as_str(),
///     "/work/project/app/src/androidTest/java"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the Android project the test files are written into.
    pub project_root: Utf8PathBuf,

    /// Test source directory, relative to the project root.
    pub test_dir: Utf8PathBuf,
}

impl OutputConfig {
    /// Returns the absolute root the materializer writes under.
    #[must_use]
    pub fn output_root(&self) -> Utf8PathBuf {
        self.project_root.join(&self.test_dir)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::new(),
            test_dir: Utf8PathBuf::from("app/src/androidTest/java"),
        }
    }
}

/// Root configuration for the qa-bridge tool.
///
/// Combines all component configurations into a single structure that can be
/// loaded from a configuration file or constructed programmatically.
///
/// # Examples
///
/// ```
/// use qab_core::BridgeConfig;
///
/// let config = BridgeConfig::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("generated_tests"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Change feed configuration.
    pub feed: FeedConfig,

    /// Output tree configuration.
    pub output: OutputConfig,
}

impl BridgeConfig {
    /// Returns the spool directory resolved against the project root.
    ///
    /// An absolute spool path is used as-is.
    #[must_use]
    pub fn spool_path(&self) -> Utf8PathBuf {
        if self.feed.spool_dir.is_absolute() {
            self.feed.spool_dir.clone()
        } else {
            self.output.project_root.join(&self.feed.spool_dir)
        }
    }
}
