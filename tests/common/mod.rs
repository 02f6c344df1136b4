#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory holding input files and the skip logs a run produces.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn skips_dir(&self) -> PathBuf {
        self.temp_dir.path().join("skips")
    }

    /// Skip logs written so far, sorted by file name.
    pub fn skip_logs(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.skips_dir()) else {
            return Vec::new();
        };
        let mut logs = entries
            .map(|entry| entry.expect("dir entry").path())
            .collect::<Vec<_>>();
        logs.sort();
        logs
    }
}
