//! Revision resolution and file snapshots against real git repositories.

mod common;

use std::path::Path;

use common::TestRepo;
use selfmt::snapshot::{
    GitSnapshots, Revision, RevisionRange, SnapshotError, SnapshotProvider,
};
use selfmt::TextDocument;
use selfmt_git::GitOid;

fn oid(hex: &str) -> GitOid {
    hex.parse().expect("valid oid")
}

fn resolve(snapshots: &GitSnapshots, spec: &str) -> Result<(Revision, Revision), SnapshotError> {
    let repo = snapshots.repo();
    let range = RevisionRange::parse_with_env(spec, |_| None).resolve(&repo)?;
    Ok((range.base, range.target))
}

#[test]
fn head_against_worktree() {
    let repo = TestRepo::new();
    let head = repo.commit(&[("a.py", "x = 1\n")], "initial");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();

    let (base, target) = resolve(&snapshots, "HEAD").unwrap();
    assert_eq!(base, Revision::Commit(oid(&head)));
    assert_eq!(target, Revision::Worktree);
}

#[test]
fn two_dot_range_compares_commits() {
    let repo = TestRepo::new();
    let first = repo.commit(&[("a.py", "x = 1\n")], "first");
    let second = repo.commit(&[("a.py", "x = 2\n")], "second");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();

    let (base, target) = resolve(&snapshots, &format!("{first}..{second}")).unwrap();
    assert_eq!(base, Revision::Commit(oid(&first)));
    assert_eq!(target, Revision::Commit(oid(&second)));
}

#[test]
fn three_dot_range_uses_merge_base() {
    let repo = TestRepo::new();
    let fork = repo.commit(&[("a.py", "x = 1\n")], "fork point");
    repo.git(&["checkout", "-q", "-b", "feature"]);
    let feature = repo.commit(&[("a.py", "x = 2\n")], "feature");
    repo.git(&["checkout", "-q", "main"]);
    repo.commit(&[("b.py", "y = 1\n")], "main moves on");

    let snapshots = GitSnapshots::discover(repo.root()).unwrap();
    let (base, target) = resolve(&snapshots, "main...feature").unwrap();
    assert_eq!(base, Revision::Commit(oid(&fork)));
    assert_eq!(target, Revision::Commit(oid(&feature)));
}

#[test]
fn unknown_revision_is_an_error() {
    let repo = TestRepo::new();
    repo.commit(&[("a.py", "x = 1\n")], "initial");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();

    let err = resolve(&snapshots, "no-such-branch").unwrap_err();
    assert!(
        matches!(&err, SnapshotError::UnknownRevision { revision } if revision == "no-such-branch"),
        "{err}"
    );
}

#[test]
fn unborn_head_resolves_to_empty() {
    let repo = TestRepo::new();
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();
    let (base, target) = resolve(&snapshots, "HEAD").unwrap();
    assert_eq!(base, Revision::Empty);
    assert_eq!(target, Revision::Worktree);
}

#[test]
fn fetch_reads_commit_and_worktree_separately() {
    let repo = TestRepo::new();
    let head = repo.commit(&[("pkg/mod.py", "x = 1\n")], "initial");
    repo.write("pkg/mod.py", "x = 2\n");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();
    let path = Path::new("pkg/mod.py");

    let committed = snapshots
        .fetch(path, &Revision::Commit(oid(&head)))
        .unwrap()
        .unwrap();
    assert_eq!(committed.text(), "x = 1\n");
    let worktree = snapshots.fetch(path, &Revision::Worktree).unwrap().unwrap();
    assert_eq!(worktree.text(), "x = 2\n");
}

#[test]
fn missing_files_fetch_as_none() {
    let repo = TestRepo::new();
    let head = repo.commit(&[("a.py", "x = 1\n")], "initial");
    repo.write("new.py", "y = 1\n");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();

    let at_head = snapshots
        .fetch(Path::new("new.py"), &Revision::Commit(oid(&head)))
        .unwrap();
    assert!(at_head.is_none());
    let absent = snapshots
        .fetch(Path::new("gone.py"), &Revision::Worktree)
        .unwrap();
    assert!(absent.is_none());
    let empty = snapshots.fetch(Path::new("a.py"), &Revision::Empty).unwrap();
    assert!(empty.is_none());
}

#[test]
fn write_worktree_keeps_the_document_layout() {
    let repo = TestRepo::new();
    repo.commit(&[("a.py", "x=1\r\ny=2")], "initial");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();

    let original = snapshots
        .fetch(Path::new("a.py"), &Revision::Worktree)
        .unwrap()
        .unwrap();
    let updated = TextDocument::from_lines(
        ["x = 1", "y=2"],
        original.newline(),
        original.has_trailing_newline(),
        original.encoding(),
    );
    snapshots.write_worktree(Path::new("a.py"), &updated).unwrap();
    assert_eq!(repo.read("a.py"), "x = 1\r\ny=2");
}

#[test]
fn paths_escaping_the_repository_are_rejected() {
    let repo = TestRepo::new();
    let head = repo.commit(&[("a.py", "x = 1\n")], "initial");
    let snapshots = GitSnapshots::discover(repo.root()).unwrap();
    assert!(
        snapshots
            .fetch(Path::new("../a.py"), &Revision::Commit(oid(&head)))
            .is_err()
    );
}
