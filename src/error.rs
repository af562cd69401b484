//! Error types for selfmt.
//!
//! Per-file failures are [`ReconcileError`] values wrapped in a
//! [`FileError`] carrying the path; they never stop sibling files. A
//! [`SetupError`] is fatal and is raised before any file is processed.
//! Messages say what went wrong and, where there is one, what to do next.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatterError;
use crate::model::DecodeError;
use crate::reconcile::verify::ParserSetupError;
use crate::snapshot::SnapshotError;

// ---------------------------------------------------------------------------
// ReconcileError
// ---------------------------------------------------------------------------

/// Why a single file could not be reconciled.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot decode file: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Formatter(#[from] FormatterError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    ParserSetup(#[from] ParserSetupError),

    /// The target revision of the file has syntax errors, so no merge can
    /// be checked against it.
    #[error("the file does not parse as Python\n  To fix: correct its syntax errors, then run again.")]
    OriginalUnparseable,

    /// No context width produced a merge equivalent to the target.
    #[error(
        "no context width up to {max_context} line(s) gives a merge equivalent to the original \
         ({attempts} attempt(s)); file left untouched\n  \
         To fix: the formatter output changes the code's structure. Check the formatter \
         version and target versions."
    )]
    Exhausted { attempts: usize, max_context: usize },
}

/// A per-file failure, with the file it belongs to.
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct FileError {
    pub path: PathBuf,
    #[source]
    pub source: ReconcileError,
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<ReconcileError>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SetupError
// ---------------------------------------------------------------------------

/// A problem that aborts the whole run before any file is touched.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configured formatter binary is not installed or not runnable.
    #[error(
        "formatter `{formatter}` is not available: `{binary} --version` failed: {reason}\n  \
         To fix: install it (e.g. `pip install {formatter}`) or set `formatter_command` \
         in the configuration."
    )]
    MissingDependency {
        formatter: &'static str,
        binary: String,
        reason: String,
    },

    #[error(transparent)]
    ParserSetup(#[from] ParserSetupError),
}
