//! Where documents come from: revision ranges and snapshot providers.
//!
//! A run compares two revisions of each file, the *base* and the *target*.
//! The revision range given on the command line is parsed into a
//! [`RevisionRange`], resolved once against the repository into a
//! [`ResolvedRange`], and every worker then fetches the two snapshots of
//! its file through a shared [`SnapshotProvider`].

mod git;
mod memory;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use selfmt_git::{GitError, GitOid, GitRepo};
use thiserror::Error;
use tracing::debug;

use crate::model::{DecodeError, TextDocument};

pub use git::GitSnapshots;
pub use memory::InMemorySnapshots;

/// Names the working tree in a revision range.
pub const WORKTREE: &str = ":WORKTREE:";
/// Reads the range from the pre-commit framework's environment.
pub const PRE_COMMIT: &str = ":PRE-COMMIT:";

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

/// One side of a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Revision {
    /// The files on disk.
    Worktree,
    Commit(GitOid),
    /// Before the first commit: every file is absent.
    Empty,
}

impl Revision {
    #[must_use]
    pub const fn is_worktree(self) -> bool {
        matches!(self, Self::Worktree)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worktree => f.write_str("working tree"),
            Self::Commit(oid) => f.write_str(&oid.short()),
            Self::Empty => f.write_str("empty tree"),
        }
    }
}

/// A parsed, unresolved revision range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionRange {
    pub base: String,
    pub target: String,
    /// Compare against the merge base of `base` and `target` (`A...B`).
    pub use_merge_base: bool,
}

impl RevisionRange {
    /// Parse a range, reading `:PRE-COMMIT:` from the process environment.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        Self::parse_with_env(spec, |key| std::env::var(key).ok())
    }

    /// Parse a range, looking environment variables up through `env`.
    ///
    /// - `A` compares `A` against the working tree
    /// - `A..B` compares `A` against `B`
    /// - `A...B` compares the merge base of `A` and `B` against `B`
    ///
    /// An empty `A` means `HEAD`; an empty `B` means the working tree.
    pub fn parse_with_env(spec: &str, env: impl Fn(&str) -> Option<String>) -> Self {
        let spec = spec.trim();
        if spec == PRE_COMMIT {
            return match pre_commit_refs(&env) {
                Some((from, to)) => Self::parse_with_env(&format!("{from}...{to}"), env),
                None => Self::parse_with_env("HEAD", env),
            };
        }

        let or_head = |s: &str| if s.is_empty() { "HEAD".to_owned() } else { s.to_owned() };
        let or_worktree = |s: &str| if s.is_empty() { WORKTREE.to_owned() } else { s.to_owned() };

        if let Some((base, target)) = spec.split_once("...") {
            return Self {
                base: or_head(base),
                target: or_worktree(target),
                use_merge_base: true,
            };
        }
        if let Some((base, target)) = spec.split_once("..") {
            return Self {
                base: or_head(base),
                target: or_worktree(target),
                use_merge_base: false,
            };
        }
        Self {
            base: or_head(spec),
            target: WORKTREE.to_owned(),
            use_merge_base: false,
        }
    }

    /// Resolve both sides to revisions of `repo`.
    ///
    /// # Errors
    /// [`SnapshotError::UnknownRevision`] if either side does not name a
    /// commit, or [`SnapshotError::NoMergeBase`] if `A...B` has no common
    /// ancestor.
    pub fn resolve(&self, repo: &dyn GitRepo) -> Result<ResolvedRange, SnapshotError> {
        let target = resolve_one(repo, &self.target)?;
        let base = if self.use_merge_base {
            let base_commit = match resolve_one(repo, &self.base)? {
                Revision::Commit(oid) => oid,
                _ => return Ok(ResolvedRange::new(Revision::Empty, target)),
            };
            let target_commit = match target {
                Revision::Commit(oid) => oid,
                Revision::Worktree => match resolve_one(repo, "HEAD")? {
                    Revision::Commit(oid) => oid,
                    _ => return Ok(ResolvedRange::new(Revision::Empty, target)),
                },
                Revision::Empty => return Ok(ResolvedRange::new(Revision::Empty, target)),
            };
            let merge_base = repo.merge_base(base_commit, target_commit)?.ok_or_else(|| {
                SnapshotError::NoMergeBase {
                    base: self.base.clone(),
                    target: self.target.clone(),
                }
            })?;
            Revision::Commit(merge_base)
        } else {
            resolve_one(repo, &self.base)?
        };
        let resolved = ResolvedRange::new(base, target);
        debug!(base = %resolved.base, target = %resolved.target, "resolved revision range");
        Ok(resolved)
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.use_merge_base { "..." } else { ".." };
        write!(f, "{}{sep}{}", self.base, self.target)
    }
}

fn pre_commit_refs(env: &impl Fn(&str) -> Option<String>) -> Option<(String, String)> {
    let pair = |from: &str, to: &str| {
        let from = env(from).filter(|s| !s.is_empty())?;
        let to = env(to).filter(|s| !s.is_empty())?;
        Some((from, to))
    };
    pair("PRE_COMMIT_FROM_REF", "PRE_COMMIT_TO_REF")
        .or_else(|| pair("PRE_COMMIT_ORIGIN", "PRE_COMMIT_SOURCE"))
}

fn resolve_one(repo: &dyn GitRepo, spec: &str) -> Result<Revision, SnapshotError> {
    if spec == WORKTREE {
        return Ok(Revision::Worktree);
    }
    match repo.rev_parse_opt(spec)? {
        Some(oid) => Ok(Revision::Commit(oid)),
        // A repository without commits has an unborn HEAD.
        None if spec == "HEAD" => Ok(Revision::Empty),
        None => Err(SnapshotError::UnknownRevision {
            revision: spec.to_owned(),
        }),
    }
}

/// Base and target, resolved once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    pub base: Revision,
    pub target: Revision,
}

impl ResolvedRange {
    #[must_use]
    pub const fn new(base: Revision, target: Revision) -> Self {
        Self { base, target }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Why a snapshot could not be read.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unknown revision `{revision}`\n  To fix: check the name with `git rev-parse {revision}`.")]
    UnknownRevision { revision: String },

    #[error("`{base}` and `{target}` have no common ancestor")]
    NoMergeBase { base: String, target: String },

    #[error("git: {0}")]
    Git(#[from] GitError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path {} is not valid UTF-8", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("cannot decode {} at {revision}: {source}", path.display())]
    Decode {
        path: PathBuf,
        revision: Revision,
        #[source]
        source: DecodeError,
    },
}

/// Reads a file as it is at some revision.
pub trait SnapshotProvider: Send + Sync {
    /// The document at `path` (repository-relative) in `revision`, or
    /// `None` if the file does not exist there.
    ///
    /// # Errors
    /// A [`SnapshotError`] if the file exists but cannot be read or decoded.
    fn fetch(&self, path: &Path, revision: &Revision) -> Result<Option<TextDocument>, SnapshotError>;

    /// Write the reconciled document back to the working tree.
    ///
    /// # Errors
    /// [`SnapshotError::Io`] if the file cannot be written.
    fn write_worktree(&self, path: &Path, document: &TextDocument) -> Result<(), SnapshotError>;
}

pub(crate) fn decode(
    path: &Path,
    revision: Revision,
    bytes: &[u8],
) -> Result<TextDocument, SnapshotError> {
    TextDocument::from_bytes(bytes).map_err(|source| SnapshotError::Decode {
        path: path.to_path_buf(),
        revision,
        source,
    })
}

pub(crate) fn encode(path: &Path, document: &TextDocument) -> Result<Vec<u8>, SnapshotError> {
    document.to_bytes().map_err(|source| SnapshotError::Decode {
        path: path.to_path_buf(),
        revision: Revision::Worktree,
        source,
    })
}
