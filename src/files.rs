//! Expand command-line paths into the Python files to process.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

/// Extensions picked up when walking a directory.
const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["__pycache__", "node_modules"];

#[derive(Debug, Error)]
pub enum FilesError {
    #[error("{}: no such file or directory", path.display())]
    NotFound { path: PathBuf },

    #[error("{} is outside the repository at {}", path.display(), root.display())]
    OutsideRepository { path: PathBuf, root: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolve `inputs` (relative to `cwd`) into sorted, de-duplicated paths
/// relative to the repository `root`.
///
/// Directories are walked recursively for Python files, skipping hidden
/// directories. A file named explicitly is kept whatever its extension.
/// Paths matching any `exclude` pattern are dropped.
///
/// # Errors
/// A [`FilesError`] if an input does not exist, lies outside `root`, or a
/// directory cannot be read.
pub fn collect_files(
    root: &Path,
    cwd: &Path,
    inputs: &[PathBuf],
    exclude: &[Pattern],
) -> Result<Vec<PathBuf>, FilesError> {
    let root = canonical(root)?;
    let mut files = Vec::new();
    for input in inputs {
        let absolute = canonical(&cwd.join(input))?;
        let Ok(relative) = absolute.strip_prefix(&root) else {
            return Err(FilesError::OutsideRepository {
                path: input.clone(),
                root,
            });
        };
        if absolute.is_dir() {
            walk(&root, relative, &mut files)?;
        } else {
            files.push(relative.to_path_buf());
        }
    }
    files.retain(|path| !is_excluded(path, exclude));
    files.sort();
    files.dedup();
    Ok(files)
}

fn canonical(path: &Path) -> Result<PathBuf, FilesError> {
    fs::canonicalize(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            FilesError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            FilesError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), FilesError> {
    let walker = WalkDir::new(root.join(dir))
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
    for entry in walker {
        let entry = entry.map_err(|e| FilesError::Io {
            path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() || !is_python(entry.path()) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name();
    let skipped = entry.file_type().is_dir()
        && (name.as_encoded_bytes().starts_with(b".")
            || SKIPPED_DIRS.iter().any(|d| name == OsStr::new(d)));
    if skipped {
        trace!(path = %entry.path().display(), "skipping directory");
    }
    skipped
}

fn is_python(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PYTHON_EXTENSIONS.contains(&e))
}

/// Whether `path` (repository-relative) matches a pattern, either as a
/// whole `/`-separated path or by file name alone.
pub fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let full = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let name = path.file_name().map(|n| n.to_string_lossy());
    patterns.iter().any(|pattern| {
        pattern.matches(&full) || name.as_deref().is_some_and(|n| pattern.matches(n))
    })
}
