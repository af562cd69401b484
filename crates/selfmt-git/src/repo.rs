//! The [`GitRepo`] trait: the abstraction boundary between selfmt and git.
//!
//! selfmt only ever *reads* from git: it resolves revision strings, finds the
//! merge base of two commits and reads a file's content at a commit. The
//! trait is object-safe so callers can use `&dyn GitRepo`.

use std::path::Path;

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, TreeEntry};

/// The git abstraction trait used by selfmt.
///
/// Implementations may be backed by gix ([`GixRepo`](crate::GixRepo)) or a
/// test double.
pub trait GitRepo {
    /// Root of the working tree, or `None` for a bare repository.
    fn workdir(&self) -> Option<&Path>;

    // -----------------------------------------------------------------------
    // Rev-parse and ancestry
    // -----------------------------------------------------------------------

    /// Resolve a revision specification (`HEAD`, `main~2`, an OID, ...) to
    /// the OID of the commit it names.
    ///
    /// Returns [`GitError::NotFound`] if the spec cannot be resolved.
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// Like [`rev_parse`](Self::rev_parse) but returns `None` instead of an
    /// error when the spec cannot be resolved.
    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    /// Best common ancestor of two commits, or `None` if their histories
    /// are unrelated.
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError>;

    // -----------------------------------------------------------------------
    // Object read
    // -----------------------------------------------------------------------

    /// Read the raw contents of a blob object.
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError>;

    /// Read the entries of a tree object.
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// Read and decode a commit object.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    /// Read the content of `path` (repository-relative, `/`-separated) as it
    /// was in `commit`.
    ///
    /// Returns `Ok(None)` when the path does not exist in that commit.
    /// Returns [`GitError::WrongKind`] when a leading component is not a
    /// directory or the final component is not a regular file.
    fn read_path_at(&self, commit: GitOid, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let mut tree = self.read_commit(commit)?.tree_oid;
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let Some((file_name, dirs)) = components.split_last() else {
            return Ok(None);
        };

        for (depth, dir) in dirs.iter().enumerate() {
            let entries = self.read_tree(tree)?;
            let Some(entry) = entries.iter().find(|e| e.name == *dir) else {
                return Ok(None);
            };
            if entry.mode != crate::types::EntryMode::Tree {
                return Err(GitError::WrongKind {
                    path: components[..=depth].join("/"),
                    expected: "directory",
                    commit: commit.to_string(),
                });
            }
            tree = entry.oid;
        }

        let entries = self.read_tree(tree)?;
        match entries.iter().find(|e| e.name == *file_name) {
            None => Ok(None),
            Some(entry) if entry.mode.is_blob() => self.read_blob(entry.oid).map(Some),
            Some(_) => Err(GitError::WrongKind {
                path: path.to_owned(),
                expected: "regular file",
                commit: commit.to_string(),
            }),
        }
    }
}
