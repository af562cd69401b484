//! Presenting results: unified diffs, the JSON summary and exit codes.

use serde::Serialize;
use similar::TextDiff;

use crate::error::FileError;
use crate::pipeline::FileOutcome;

/// What the run does with reconciled files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Write changed files back to the working tree.
    #[default]
    Write,
    /// Only report whether anything would change.
    Check,
    /// Print unified diffs.
    Diff,
    /// Print the reconciled text of a single file.
    Stdout,
}

impl Mode {
    #[must_use]
    pub const fn writes(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    /// `--check` found files that would change.
    pub const WOULD_CHANGE: u8 = 1;
    /// Some file failed, or the run could not start.
    pub const FAILURE: u8 = 2;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    Reformatted,
    WouldReformat,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a whole run, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub files: Vec<FileReport>,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl RunReport {
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: &Result<FileOutcome, FileError>) {
        let report = match result {
            Ok(outcome) => {
                let status = match (outcome.changed, self.mode.writes()) {
                    (false, _) => FileStatus::Unchanged,
                    (true, true) => FileStatus::Reformatted,
                    (true, false) => FileStatus::WouldReformat,
                };
                if outcome.changed {
                    self.changed += 1;
                } else {
                    self.unchanged += 1;
                }
                FileReport {
                    path: display_path(&outcome.path),
                    status,
                    context: outcome.context,
                    error: None,
                }
            }
            Err(e) => {
                self.failed += 1;
                FileReport {
                    path: display_path(&e.path),
                    status: FileStatus::Failed,
                    context: None,
                    error: Some(e.source.to_string()),
                }
            }
        };
        self.files.push(report);
    }

    /// Turn a successful write into a failure, e.g. when writing back fails.
    pub fn mark_failed(&mut self, error: &FileError) {
        let path = display_path(&error.path);
        if let Some(file) = self.files.iter_mut().find(|f| f.path == path)
            && file.status != FileStatus::Failed
        {
            file.status = FileStatus::Failed;
            file.error = Some(error.source.to_string());
            self.changed = self.changed.saturating_sub(1);
            self.failed += 1;
        }
    }

    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.failed > 0 {
            exit::FAILURE
        } else if self.changed > 0 && matches!(self.mode, Mode::Check) {
            exit::WOULD_CHANGE
        } else {
            exit::SUCCESS
        }
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = if self.mode.writes() {
            "reformatted"
        } else {
            "would be reformatted"
        };
        let mut parts = vec![
            format!("{} file(s) {verb}", self.changed),
            format!("{} file(s) left unchanged", self.unchanged),
        ];
        if self.failed > 0 {
            parts.push(format!("{} file(s) failed", self.failed));
        }
        parts.join(", ")
    }
}

fn display_path(path: &std::path::Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Unified diff from the target to the reconciled text, or an empty string
/// if nothing changed.
#[must_use]
pub fn unified_diff(outcome: &FileOutcome) -> String {
    if !outcome.changed {
        return String::new();
    }
    let path = display_path(&outcome.path);
    let old = outcome.original.text();
    let new = outcome.merged.text();
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
