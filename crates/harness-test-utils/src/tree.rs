//! Temporary file trees for test scenarios

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory with helper methods for setting up files and
/// asserting on them afterwards.
///
/// # Example
///
/// ```
/// use harness_test_utils::TestTree;
///
/// let tree = TestTree::new();
/// tree.write_file(".ssh/config", "Host example\n");
/// tree.assert_file_exists(".ssh/config");
/// assert_eq!(tree.read_file(".ssh/config"), "Host example\n");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestTree: failed to create temp dir"),
        }
    }

    /// Root path of the tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a file inside the tree, whether or not it exists.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file, creating parent directories as needed. Returns the
    /// absolute path.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("TestTree: failed to create parent dirs");
        }
        fs::write(&path, content).expect("TestTree: failed to write file");
        path
    }

    /// Read a file that is expected to exist.
    pub fn read_file(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("TestTree: failed to read file")
    }

    pub fn assert_file_exists(&self, relative: &str) {
        assert!(
            self.path(relative).is_file(),
            "expected file to exist: {relative}"
        );
    }

    pub fn assert_file_absent(&self, relative: &str) {
        assert!(
            !self.path(relative).exists(),
            "expected file to be absent: {relative}"
        );
    }
}
