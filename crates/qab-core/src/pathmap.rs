//! Mapping from dotted package identifiers to filesystem paths.
//!
//! A package like `com.example.foo` maps to the relative directory
//! `com/example/foo`, one path segment per dot-separated component. The split
//! is purely syntactic: no validation is performed here, and degenerate input
//! (empty string, leading/trailing/double dots) produces degenerate output.
//! Whether a segment is a legal, safe filesystem name is decided by the
//! materializer, which owns the output root.

use camino::Utf8PathBuf;
use smallvec::SmallVec;

/// Splits a dotted package identifier into ordered path segments.
///
/// An empty identifier yields no segments. Otherwise the result contains
/// exactly the substrings between dots, in original order, including empty
/// ones for consecutive or edge dots.
///
/// # Examples
///
/// ```
/// use qab_core::pathmap::segments;
///
/// let segs = segments("com.example.foo");
/// assert_eq!(segs.as_slice(), ["com", "example", "foo"]);
///
/// // Degenerate input passes through unchanged
/// assert_eq!(segments("a..b").as_slice(), ["a", "", "b"]);
/// assert!(segments("").is_empty());
/// ```
#[must_use]
pub fn segments(package: &str) -> SmallVec<[&str; 8]> {
    if package.is_empty() {
        return SmallVec::new();
    }
    package.split('.').collect()
}

/// Returns the relative directory a package maps to.
///
/// This is the joined form of [`segments`]; it carries no more validation
/// than the split itself.
///
/// # Examples
///
/// ```
/// use qab_core::pathmap::relative_dir;
///
/// assert_eq!(relative_dir("com.example.foo").as_str(), "com/example/foo");
/// assert_eq!(relative_dir("single").as_str(), "single");
/// ```
#[must_use]
pub fn relative_dir(package: &str) -> Utf8PathBuf {
    segments(package).iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_in_order() {
        let segs = segments("dev.belalkhan.cutthenoise");
        assert_eq!(segs.as_slice(), ["dev", "belalkhan", "cutthenoise"]);
    }

    #[test]
    fn test_segments_single_component() {
        assert_eq!(segments("root").as_slice(), ["root"]);
    }

    #[test]
    fn test_segments_empty_input() {
        assert!(segments("").is_empty());
    }

    #[test]
    fn test_segments_degenerate_dots() {
        // Splitting is syntactic; empty segments are preserved for the
        // materializer to reject.
        assert_eq!(segments(".a").as_slice(), ["", "a"]);
        assert_eq!(segments("a.").as_slice(), ["a", ""]);
        assert_eq!(segments("..").as_slice(), ["", "", ""]);
    }

    #[test]
    fn test_segment_count_matches_dots() {
        let package = "a.b.c.d.e";
        assert_eq!(segments(package).len(), package.split('.').count());
    }

    #[test]
    fn test_relative_dir_join() {
        insta::assert_snapshot!(relative_dir("com.example.foo"), @"com/example/foo");
    }

    #[test]
    fn test_relative_dir_empty() {
        assert_eq!(relative_dir("").as_str(), "");
    }
}
