//! The gix-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{CommitInfo, GitOid, TreeEntry};

/// A [`GitRepo`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// A `GixRepo` is cheap to use but must stay on one thread. Convert it with
/// [`GixRepo::into_sync`] to share it across worker threads.
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: Option<PathBuf>,
}

impl GixRepo {
    /// Open the git repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(path).map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })?;
        Ok(Self::from_repository(repo))
    }

    /// Open a git repository at exactly `path` (no parent discovery).
    pub fn open_at(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open_opts(path, gix::open::Options::isolated()).map_err(|e| {
            GitError::BackendError {
                message: e.to_string(),
            }
        })?;
        Ok(Self::from_repository(repo))
    }

    fn from_repository(repo: gix::Repository) -> Self {
        let workdir = repo.workdir().map(Path::to_path_buf);
        Self { repo, workdir }
    }

    /// Turn this handle into one that can be shared between threads.
    #[must_use]
    pub fn into_sync(self) -> SyncGixRepo {
        SyncGixRepo {
            repo: self.repo.into_sync(),
            workdir: self.workdir,
        }
    }
}

/// A thread-safe handle on a gix repository.
///
/// Each worker calls [`SyncGixRepo::to_local`] to obtain its own
/// [`GixRepo`]; the object database is shared underneath.
pub struct SyncGixRepo {
    repo: gix::ThreadSafeRepository,
    workdir: Option<PathBuf>,
}

impl SyncGixRepo {
    /// A thread-local [`GixRepo`] for the calling thread.
    #[must_use]
    pub fn to_local(&self) -> GixRepo {
        GixRepo {
            repo: self.repo.to_thread_local(),
            workdir: self.workdir.clone(),
        }
    }

    /// Root of the working tree, or `None` for a bare repository.
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }
}

impl GitRepo for GixRepo {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    // === Rev-parse and ancestry ===
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::refs_impl::rev_parse(self, spec)
    }

    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::rev_parse_opt(self, spec)
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::merge_base(self, a, b)
    }

    // === Object read ===
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
        crate::objects_impl::read_blob(self, oid)
    }

    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
        crate::objects_impl::read_tree(self, oid)
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::objects_impl::read_commit(self, oid)
    }
}
