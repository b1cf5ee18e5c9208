//! Crash-safe file materialization.
//!
//! The materializer owns the output root and is the single point where a
//! payload meets the disk. Two properties hold for every write:
//!
//! - **Idempotent**: the target location is a pure function of
//!   `(root, package, filename)`; writing the same payload twice leaves one
//!   file with the payload's content. Existing files are silently replaced -
//!   that is the contract that makes feed replay harmless.
//! - **Crash-safe**: content goes into a uniquely named temporary file in the
//!   target directory and is renamed over the destination, so a crash
//!   mid-write never leaves a truncated file at the target path.
//!
//! Path components derived from the remote document are validated here, not
//! in the mapper: any empty, relative-escaping, or separator-bearing
//! component fails the write before any filesystem contact.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;

use qab_core::{TestPayload, pathmap};

use crate::error::MaterializeError;

/// Writes validated payloads under an injected output root.
///
/// The root is always passed in explicitly so tests can point writes at an
/// isolated temporary directory.
///
/// # Thread Safety
///
/// The materializer holds no mutable state; concurrent writes are safe.
/// Two concurrent writes to the same target are last-write-wins, each one
/// atomic.
///
/// # Examples
///
/// ```
/// use qab_core::TestPayload;
/// use qab_sink::Materializer;
///
/// # fn example() -> Result<(), qab_sink::MaterializeError> {
/// let materializer = Materializer::new("/tmp/androidTest/java");
/// let payload = TestPayload {
///     package: "com.example.foo".to_owned(),
///     filename: "FooTest.java".to_owned(),
///     content: "class FooTest {}".to_owned(),
/// };
///
/// let written = materializer.write(&payload)?;
/// assert!(written.as_str().ends_with("com/example/foo/FooTest.java"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Materializer {
    /// The root everything is written under.
    root: Utf8PathBuf,
}

impl Materializer {
    /// Creates a materializer writing under the given root.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the output root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Computes the target directory for a payload's package.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError::UnsafeComponent`] if any package segment
    /// is not a legal target name.
    pub fn target_dir(&self, package: &str) -> Result<Utf8PathBuf, MaterializeError> {
        let mut dir = self.root.clone();
        for segment in pathmap::segments(package) {
            ensure_safe_component(segment)?;
            dir.push(segment);
        }
        Ok(dir)
    }

    /// Computes the full target path for a payload without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError::UnsafeComponent`] if any package segment
    /// or the filename is not a legal target name.
    pub fn target_path(&self, payload: &TestPayload) -> Result<Utf8PathBuf, MaterializeError> {
        let dir = self.target_dir(&payload.package)?;
        ensure_safe_component(&payload.filename)?;
        Ok(dir.join(&payload.filename))
    }

    /// Materializes one payload, returning the absolute path written.
    ///
    /// The target directory and all missing ancestors are created
    /// idempotently; the content then replaces whatever was at the target
    /// path via a temp-file-and-rename.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError`] if a component is unsafe or any
    /// filesystem step fails. No partial file is ever visible at the target
    /// path.
    pub fn write(&self, payload: &TestPayload) -> Result<Utf8PathBuf, MaterializeError> {
        let dir = self.target_dir(&payload.package)?;
        ensure_safe_component(&payload.filename)?;
        let target = dir.join(&payload.filename);

        // Idempotent create: succeeds silently if already present
        std::fs::create_dir_all(&dir).map_err(|source| MaterializeError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut temp =
            NamedTempFile::new_in(&dir).map_err(|source| MaterializeError::Write {
                path: target.clone(),
                source,
            })?;

        temp.write_all(payload.content.as_bytes())
            .map_err(|source| MaterializeError::Write {
                path: target.clone(),
                source,
            })?;

        // Complete-file replace: an existing file is silently overwritten
        temp.persist(&target)
            .map_err(|e| MaterializeError::Persist {
                path: target.clone(),
                source: e.error,
            })?;

        Ok(target)
    }
}

/// Rejects components that would escape the root or split into extra
/// path levels.
fn ensure_safe_component(component: &str) -> Result<(), MaterializeError> {
    let illegal = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains('/')
        || component.contains('\\')
        || Utf8Path::new(component).is_absolute();

    if illegal {
        return Err(MaterializeError::unsafe_component(component));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Materializer) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, Materializer::new(root))
    }

    fn payload(package: &str, filename: &str, content: &str) -> TestPayload {
        TestPayload {
            package: package.to_owned(),
            filename: filename.to_owned(),
            content: content.to_owned(),
        }
    }

    #[test]
    fn test_write_round_trip() {
        let (_guard, materializer) = temp_root();
        let payload = payload("com.example.foo", "FooTest.java", "class FooTest {}");

        let written = materializer.write(&payload).expect("write");

        assert!(written.as_str().ends_with("com/example/foo/FooTest.java"));
        let on_disk = std::fs::read_to_string(&written).expect("read back");
        assert_eq!(on_disk, "class FooTest {}");
    }

    #[test]
    fn test_write_is_idempotent() {
        let (_guard, materializer) = temp_root();
        let first = payload("com.example", "T.java", "v1");
        let second = payload("com.example", "T.java", "v2");

        let path_one = materializer.write(&first).expect("first write");
        let path_two = materializer.write(&second).expect("second write");

        assert_eq!(path_one, path_two);
        let dir = path_one.parent().expect("parent dir");
        let entries = std::fs::read_dir(dir).expect("read dir").count();
        assert_eq!(entries, 1, "exactly one file at the derived location");
        assert_eq!(std::fs::read_to_string(&path_two).expect("read"), "v2");
    }

    #[test]
    fn test_write_creates_missing_ancestors() {
        let (_guard, materializer) = temp_root();
        let deep = payload("a.b.c.d.e", "Deep.java", "x");

        let written = materializer.write(&deep).expect("write");
        assert!(written.parent().expect("dir").is_dir());
    }

    #[test]
    fn test_single_segment_package() {
        let (_guard, materializer) = temp_root();
        let written = materializer
            .write(&payload("root", "R.java", "y"))
            .expect("write");
        assert!(written.as_str().ends_with("root/R.java"));
    }

    #[test]
    fn test_traversal_segments_are_rejected() {
        let (_guard, materializer) = temp_root();

        for package in ["..", "com..example", "com.example.."] {
            let err = materializer
                .write(&payload(package, "Escape.java", "x"))
                .expect_err("unsafe package must fail");
            assert!(err.is_unsafe_component(), "package {package:?}: {err}");
        }
    }

    #[test]
    fn test_separator_bearing_components_are_rejected() {
        let (_guard, materializer) = temp_root();

        let err = materializer
            .write(&payload("com.example", "../Escape.java", "x"))
            .expect_err("unsafe filename must fail");
        assert!(err.is_unsafe_component());

        let err = materializer
            .write(&payload("com.example", "nested/Escape.java", "x"))
            .expect_err("separator filename must fail");
        assert!(err.is_unsafe_component());
    }

    #[test]
    fn test_empty_package_is_rejected_before_io() {
        let (_guard, materializer) = temp_root();
        // The mapper passes the degenerate input through; the materializer
        // refuses the empty filename-level component.
        let err = materializer
            .write(&payload("com.example", "", "x"))
            .expect_err("empty filename must fail");
        assert!(err.is_unsafe_component());
    }

    #[test]
    fn test_rejection_leaves_no_directories() {
        let (guard, materializer) = temp_root();
        let _ = materializer.write(&payload("safe.until...here", "T.java", "x"));

        let entries = std::fs::read_dir(guard.path()).expect("read dir").count();
        assert_eq!(entries, 0, "no directories created for rejected writes");
    }

    #[test]
    fn test_target_path_matches_write() {
        let (_guard, materializer) = temp_root();
        let p = payload("com.example.foo", "FooTest.java", "x");

        let predicted = materializer.target_path(&p).expect("target path");
        let written = materializer.write(&p).expect("write");
        assert_eq!(predicted, written);
    }
}
