//! The per-file pipeline: fetch both revisions, format, reconcile.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, info_span};

use crate::error::{FileError, ReconcileError};
use crate::format::{Formatter, FormatterConfig};
use crate::model::TextDocument;
use crate::pool::WorkerPool;
use crate::reconcile::find_safe_reconciliation;
use crate::snapshot::{ResolvedRange, Revision, SnapshotProvider};

/// Everything a worker needs, shared read-only across the run.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub snapshots: &'a dyn SnapshotProvider,
    pub formatter: &'a dyn Formatter,
    pub formatter_config: &'a FormatterConfig,
    pub range: ResolvedRange,
}

/// The result of processing one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// The file as it is in the target revision.
    pub original: TextDocument,
    pub merged: TextDocument,
    /// Whether `merged` differs from `original`.
    pub changed: bool,
    /// The context width the merge needed, if a merge was attempted.
    pub context: Option<usize>,
}

impl FileOutcome {
    fn unchanged(path: &Path, original: TextDocument) -> Self {
        Self {
            path: path.to_path_buf(),
            merged: original.clone(),
            original,
            changed: false,
            context: None,
        }
    }
}

/// Reconcile one file whose base and target are already at hand.
///
/// The formatter only runs when `target` differs from `base`.
///
/// # Errors
/// A [`ReconcileError`] when formatting fails, the target does not parse,
/// or no context width gives an equivalent merge.
pub fn reconcile_file(
    path: &Path,
    base: &TextDocument,
    target: &TextDocument,
    formatter: &dyn Formatter,
    config: &FormatterConfig,
) -> Result<FileOutcome, ReconcileError> {
    if target.is_empty() || base.same_lines(target) {
        debug!("no edits");
        return Ok(FileOutcome::unchanged(path, target.clone()));
    }

    let candidate = formatter.format(path, target, config)?;
    if candidate.same_lines(target) {
        debug!(formatter = formatter.name(), "already formatted");
        return Ok(FileOutcome::unchanged(path, target.clone()));
    }

    let reconciliation = find_safe_reconciliation(base, target, &candidate)?;
    let changed = reconciliation.document != *target;
    Ok(FileOutcome {
        path: path.to_path_buf(),
        original: target.clone(),
        merged: reconciliation.document,
        changed,
        context: Some(reconciliation.context),
    })
}

impl RunContext<'_> {
    /// Fetch, format and reconcile one repository-relative path.
    ///
    /// # Errors
    /// A [`FileError`] naming the path; other files are unaffected.
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome, FileError> {
        let _span = info_span!("file", path = %path.display()).entered();
        let result = self.fetch_and_reconcile(path);
        match &result {
            Ok(outcome) if outcome.changed => {
                info!(context = outcome.context, "reformatted edited lines");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e.source, "file failed"),
        }
        result
    }

    fn fetch_and_reconcile(&self, path: &Path) -> Result<FileOutcome, FileError> {
        let fetch = |revision: &Revision| {
            self.snapshots
                .fetch(path, revision)
                .map_err(|e| FileError::new(path, e))
        };
        let Some(target) = fetch(&self.range.target)? else {
            debug!(revision = %self.range.target, "not present in target revision");
            return Ok(FileOutcome::unchanged(path, TextDocument::empty()));
        };
        let base = fetch(&self.range.base)?.unwrap_or_else(TextDocument::empty);
        reconcile_file(path, &base, &target, self.formatter, self.formatter_config)
            .map_err(|e| FileError::new(path, e))
    }

    /// Process every path on `pool`. Results are in input order.
    pub fn run(&self, pool: WorkerPool, paths: &[PathBuf]) -> Vec<Result<FileOutcome, FileError>> {
        info!(
            files = paths.len(),
            workers = pool.workers(),
            base = %self.range.base,
            target = %self.range.target,
            formatter = self.formatter.name(),
            "processing files"
        );
        pool.run_all(paths, |path| self.process_file(path))
    }

    /// Write a changed outcome back to the working tree.
    ///
    /// Does nothing unless the target revision is the working tree.
    ///
    /// # Errors
    /// A [`FileError`] if the file cannot be written.
    pub fn write_back(&self, outcome: &FileOutcome) -> Result<bool, FileError> {
        if !outcome.changed || !self.range.target.is_worktree() {
            return Ok(false);
        }
        self.snapshots
            .write_worktree(&outcome.path, &outcome.merged)
            .map_err(|e| FileError::new(&outcome.path, e))?;
        Ok(true)
    }
}
