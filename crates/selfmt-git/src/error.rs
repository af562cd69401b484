//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo)
//! methods. Callers match on [`GitError::NotFound`] to tell a missing revision or
//! path apart from a broken repository.

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object, revision, or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// An OID could not be parsed or used an unsupported hash width.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// A path component resolved to something that is not a tree or blob
    /// where one was required (e.g. `src/lib.py` where `src` is a file).
    #[error("`{path}` is not a {expected} in commit {commit}")]
    WrongKind {
        /// The repository-relative path being resolved.
        path: String,
        /// What was expected at that path.
        expected: &'static str,
        /// The commit the path was resolved against.
        commit: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The underlying git backend returned an unclassified error.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}
