use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Revision, SnapshotError, SnapshotProvider};
use crate::model::TextDocument;

/// Snapshots held in memory. Used by tests and by callers that already
/// have both revisions of a file at hand.
#[derive(Debug, Default)]
pub struct InMemorySnapshots {
    files: HashMap<(PathBuf, Revision), TextDocument>,
    written: Mutex<Vec<(PathBuf, TextDocument)>>,
}

impl InMemorySnapshots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` as it is in `revision`.
    #[must_use]
    pub fn with(mut self, path: impl Into<PathBuf>, revision: Revision, document: TextDocument) -> Self {
        self.insert(path, revision, document);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, revision: Revision, document: TextDocument) {
        self.files.insert((path.into(), revision), document);
    }

    /// Everything passed to [`SnapshotProvider::write_worktree`], in call
    /// order.
    #[must_use]
    pub fn written(&self) -> Vec<(PathBuf, TextDocument)> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl SnapshotProvider for InMemorySnapshots {
    fn fetch(&self, path: &Path, revision: &Revision) -> Result<Option<TextDocument>, SnapshotError> {
        Ok(self.files.get(&(path.to_path_buf(), *revision)).cloned())
    }

    fn write_worktree(&self, path: &Path, document: &TextDocument) -> Result<(), SnapshotError> {
        let mut written = self
            .written
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        written.push((path.to_path_buf(), document.clone()));
        Ok(())
    }
}
