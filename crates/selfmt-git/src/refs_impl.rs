//! gix-backed rev-parse and ancestry operations.

use tracing::debug;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::objects_impl::{from_gix_oid, to_gix_oid};
use crate::types::GitOid;

/// Append the peel-to-commit suffix so tags and symbolic refs resolve to
/// the commit they point at.
fn commit_spec(spec: &str) -> String {
    format!("{spec}^{{commit}}")
}

pub fn rev_parse(repo: &GixRepo, spec: &str) -> Result<GitOid, GitError> {
    let id = repo
        .repo
        .rev_parse_single(commit_spec(spec).as_str())
        .map_err(|e| GitError::NotFound {
            message: format!("rev-parse '{spec}': {e}"),
        })?;
    from_gix_oid(id.as_ref())
}

pub fn rev_parse_opt(repo: &GixRepo, spec: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.rev_parse_single(commit_spec(spec).as_str()) {
        Ok(id) => from_gix_oid(id.as_ref()).map(Some),
        Err(e) => {
            // Malformed specs, missing refs and unborn HEAD all mean the
            // spec could not be resolved.
            debug!(spec, error = %e, "revision did not resolve");
            Ok(None)
        }
    }
}

pub fn merge_base(repo: &GixRepo, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
    if a == b {
        return Ok(Some(a));
    }
    match repo.repo.merge_base(to_gix_oid(a), to_gix_oid(b)) {
        Ok(id) => from_gix_oid(id.as_ref()).map(Some),
        Err(gix::repository::merge_base::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(GitError::BackendError {
            message: e.to_string(),
        }),
    }
}
