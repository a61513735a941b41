// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::FileSystem;

/// In-memory filesystem holding a flat set of files.
///
/// Each file remembers whether it carries an executable bit.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, bool>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executable file (e.g. a fake `/usr/bin/dig`).
    pub fn add_executable(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), true);
    }

    /// Register a plain, non-executable file.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), false);
    }

    /// Remove a file, e.g. to simulate a tool being uninstalled.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.remove(path.as_ref());
    }

    fn insert(&self, path: &Path, executable: bool) {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.insert(path.to_path_buf(), executable);
    }
}

impl FileSystem for MockFileSystem {
    fn is_executable(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.get(path).copied().unwrap_or(false)
    }
}
