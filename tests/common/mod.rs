//! selfmt test infrastructure.
#![allow(dead_code)]
//!
//! Provides [`TestRepo`], a throwaway git repository in a temporary
//! directory. Each instance runs real git commands and cleans up on drop.
//! A stand-in formatter script keeps the CLI tests independent of black
//! and ruff being installed.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

// ---------------------------------------------------------------------------
// TestRepo
// ---------------------------------------------------------------------------

/// A git repository on branch `main` with no commits yet.
pub struct TestRepo {
    _dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// # Panics
    /// Panics if any git command fails.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path().to_path_buf();
        git_ok(&root, &["init", "-q", "-b", "main"]);
        git_ok(&root, &["config", "user.name", "Test"]);
        git_ok(&root, &["config", "user.email", "test@localhost"]);
        git_ok(&root, &["config", "commit.gpgsign", "false"]);
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git(&self, args: &[&str]) -> String {
        git_ok(&self.root, args)
    }

    /// Write a file in the working tree.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(full, content).expect("failed to write file");
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.root.join(path)).expect("failed to read file")
    }

    /// Write, stage and commit files. Returns the new commit id.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        for (path, content) in files {
            self.write(path, content);
            self.git(&["add", path]);
        }
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Install the stand-in formatter and point `selfmt.toml` at it.
    ///
    /// The script spaces out `name=number` assignment lines and leaves
    /// everything else alone, whatever arguments it is given.
    pub fn use_spacing_formatter(&self) {
        let script = self.root.join(".fmt.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nexec sed -E 's/^( *)([a-z_]+)=([0-9]+)$/\\1\\2 = \\3/'\n",
        )
        .expect("failed to write formatter script");
        self.write(
            "selfmt.toml",
            &format!(
                "formatter = \"black\"\nformatter_command = \"sh {}\"\n",
                script.display()
            ),
        );
    }

    /// Run `selfmt` in the repository root.
    pub fn selfmt(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_selfmt"))
            .args(args)
            .current_dir(&self.root)
            .env_remove("SELFMT_LOG")
            .env_remove("SELFMT_LOG_FORMAT")
            .env_remove("SELFMT_JOBS")
            .output()
            .expect("failed to run selfmt")
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn git_ok(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}
