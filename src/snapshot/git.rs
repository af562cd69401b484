//! Snapshots backed by a git repository.
//!
//! Committed revisions are read through gix as blobs at a path; the working
//! tree is read from and written back to disk under the repository root.
//! Paths handed to gix are always relative and use `/` separators.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use selfmt_git::{GitRepo, GixRepo, SyncGixRepo};
use tracing::trace;

use super::{Revision, SnapshotError, SnapshotProvider, decode, encode};
use crate::model::TextDocument;

/// Snapshots read from a git repository and its working tree.
pub struct GitSnapshots {
    repo: SyncGixRepo,
    root: PathBuf,
}

impl GitSnapshots {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    /// [`SnapshotError::Git`] if `path` is not inside a git working tree.
    pub fn discover(path: &Path) -> Result<Self, SnapshotError> {
        let repo = GixRepo::open(path)?;
        let Some(root) = repo.workdir().map(Path::to_path_buf) else {
            return Err(SnapshotError::Git(selfmt_git::GitError::NotFound {
                message: format!("{} is in a bare repository", path.display()),
            }));
        };
        Ok(Self {
            repo: repo.into_sync(),
            root,
        })
    }

    /// Root of the working tree; paths passed to [`SnapshotProvider::fetch`]
    /// are relative to it.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A handle on the repository for the calling thread.
    #[must_use]
    pub fn repo(&self) -> GixRepo {
        self.repo.to_local()
    }
}

/// `a/b/c.py` with `/` separators, as git stores it.
fn git_path(path: &Path) -> Result<String, SnapshotError> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => {
                    return Err(SnapshotError::NonUtf8Path {
                        path: path.to_path_buf(),
                    });
                }
            },
            Component::CurDir => {}
            _ => {
                return Err(SnapshotError::Io {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "path must be relative to the repository root",
                    ),
                });
            }
        }
    }
    Ok(parts.join("/"))
}

impl SnapshotProvider for GitSnapshots {
    fn fetch(&self, path: &Path, revision: &Revision) -> Result<Option<TextDocument>, SnapshotError> {
        trace!(path = %path.display(), %revision, "fetching snapshot");
        let bytes = match revision {
            Revision::Empty => return Ok(None),
            Revision::Worktree => match fs::read(self.root.join(path)) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(source) => {
                    return Err(SnapshotError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            },
            Revision::Commit(oid) => {
                let Some(bytes) = self.repo.to_local().read_path_at(*oid, &git_path(path)?)? else {
                    return Ok(None);
                };
                bytes
            }
        };
        decode(path, *revision, &bytes).map(Some)
    }

    fn write_worktree(&self, path: &Path, document: &TextDocument) -> Result<(), SnapshotError> {
        let bytes = encode(path, document)?;
        fs::write(self.root.join(path), bytes).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
