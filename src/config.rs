//! selfmt configuration (`selfmt.toml` or `[tool.selfmt]` in
//! `pyproject.toml`).
//!
//! Every key is optional; a missing file means all defaults. Command-line
//! flags override whatever the file says.
//!
//! ```toml
//! revision = "origin/main..."
//! formatter = "ruff"
//! line_length = 100
//! exclude = ["migrations/*", "*_pb2.py"]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::format::{FormatterConfig, FormatterKind};

/// Name of the dedicated configuration file.
pub const CONFIG_FILE: &str = "selfmt.toml";
/// Name of the shared Python project file.
pub const PYPROJECT_FILE: &str = "pyproject.toml";

// ---------------------------------------------------------------------------
// SelfmtConfig
// ---------------------------------------------------------------------------

/// Top-level selfmt configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfmtConfig {
    /// Revision range to compare (default: `"HEAD"`).
    #[serde(default = "default_revision")]
    pub revision: String,

    #[serde(default)]
    pub formatter: FormatterKind,

    /// Command that runs the formatter, e.g. `"python -m black"`.
    #[serde(default)]
    pub formatter_command: Option<String>,

    #[serde(default)]
    pub line_length: Option<u32>,

    /// Black only.
    #[serde(default)]
    pub skip_string_normalization: bool,

    /// Black only, e.g. `["py310", "py311"]`.
    #[serde(default)]
    pub target_versions: Vec<String>,

    /// Worker threads; 0 means one per core.
    #[serde(default)]
    pub jobs: usize,

    /// Glob patterns (relative to the repository root) of files to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for SelfmtConfig {
    fn default() -> Self {
        Self {
            revision: default_revision(),
            formatter: FormatterKind::default(),
            formatter_command: None,
            line_length: None,
            skip_string_normalization: false,
            target_versions: Vec::new(),
            jobs: 0,
            exclude: Vec::new(),
        }
    }
}

fn default_revision() -> String {
    "HEAD".to_owned()
}

impl SelfmtConfig {
    /// The subset of settings the formatter sees.
    #[must_use]
    pub fn formatter_config(&self) -> FormatterConfig {
        FormatterConfig {
            line_length: self.line_length,
            skip_string_normalization: self.skip_string_normalization,
            target_versions: self.target_versions.clone(),
        }
    }

    /// Compile the `exclude` patterns.
    ///
    /// # Errors
    /// Returns `ConfigError` naming the first invalid pattern.
    pub fn exclude_patterns(&self) -> Result<Vec<glob::Pattern>, ConfigError> {
        self.exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| ConfigError {
                    path: None,
                    message: format!("invalid exclude pattern `{p}`: {e}"),
                })
            })
            .collect()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.line_length == Some(0) {
            return Err(ConfigError {
                path: None,
                message: "line_length must be greater than 0".to_owned(),
            });
        }
        self.exclude_patterns()?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Deserialize)]
struct PyProject {
    #[serde(default)]
    tool: Option<Tool>,
}

#[derive(Deserialize)]
struct Tool {
    #[serde(default)]
    selfmt: Option<SelfmtConfig>,
}

fn toml_error(source: &str, e: &toml::de::Error) -> ConfigError {
    let mut message = e.message().to_owned();
    if let Some(span) = e.span() {
        let line = source[..span.start].chars().filter(|&c| c == '\n').count() + 1;
        message = format!("line {line}: {message}");
    }
    ConfigError {
        path: None,
        message,
    }
}

fn read(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError {
            path: Some(path.to_owned()),
            message: format!("could not read file: {e}"),
        }),
    }
}

fn with_path(path: &Path) -> impl Fn(ConfigError) -> ConfigError + '_ {
    move |mut e| {
        e.path = Some(path.to_owned());
        e
    }
}

impl SelfmtConfig {
    /// Load configuration from a `selfmt.toml`-style file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match read(path)? {
            Some(contents) => Self::parse(&contents).map_err(with_path(path)),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields or invalid values.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(toml_str)
            .map_err(|e| toml_error(toml_str, &e))?
            .validate()
    }

    /// Parse the `[tool.selfmt]` table of a `pyproject.toml`, if it has one.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file is invalid TOML or the table is
    /// invalid. Other tools' tables are not checked.
    pub fn parse_pyproject(toml_str: &str) -> Result<Option<Self>, ConfigError> {
        let project: PyProject = toml::from_str(toml_str).map_err(|e| toml_error(toml_str, &e))?;
        project
            .tool
            .and_then(|tool| tool.selfmt)
            .map(Self::validate)
            .transpose()
    }

    /// Find and load the configuration for a run started in `start`.
    ///
    /// Searches `start` and its ancestors, stopping after `stop` (the
    /// repository root) if given. In each directory `selfmt.toml` wins over
    /// a `pyproject.toml` with a `[tool.selfmt]` table. Nothing found means
    /// defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if a file is found but cannot be loaded.
    pub fn discover(start: &Path, stop: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for dir in start.ancestors() {
            let dedicated = dir.join(CONFIG_FILE);
            if let Some(contents) = read(&dedicated)? {
                debug!(path = %dedicated.display(), "loading configuration");
                let config = Self::parse(&contents).map_err(with_path(&dedicated))?;
                return Ok((config, Some(dedicated)));
            }
            let pyproject = dir.join(PYPROJECT_FILE);
            if let Some(contents) = read(&pyproject)?
                && let Some(config) =
                    Self::parse_pyproject(&contents).map_err(with_path(&pyproject))?
            {
                debug!(path = %pyproject.display(), "loading configuration");
                return Ok((config, Some(pyproject)));
            }
            if stop.is_some_and(|stop| dir == stop) {
                break;
            }
        }
        Ok((Self::default(), None))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = SelfmtConfig::default();
        assert_eq!(cfg.revision, "HEAD");
        assert_eq!(cfg.formatter, FormatterKind::Black);
        assert_eq!(cfg.formatter_command, None);
        assert_eq!(cfg.line_length, None);
        assert!(!cfg.skip_string_normalization);
        assert!(cfg.target_versions.is_empty());
        assert_eq!(cfg.jobs, 0);
        assert!(cfg.exclude.is_empty());
    }

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(SelfmtConfig::parse("").unwrap(), SelfmtConfig::default());
    }

    #[test]
    fn parse_every_key() {
        let cfg = SelfmtConfig::parse(
            r#"
revision = "main..."
formatter = "ruff"
formatter_command = "uvx ruff"
line_length = 100
skip_string_normalization = true
target_versions = ["py311"]
jobs = 4
exclude = ["build/*"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.revision, "main...");
        assert_eq!(cfg.formatter, FormatterKind::Ruff);
        assert_eq!(cfg.formatter_command.as_deref(), Some("uvx ruff"));
        assert_eq!(cfg.line_length, Some(100));
        assert!(cfg.skip_string_normalization);
        assert_eq!(cfg.target_versions, ["py311"]);
        assert_eq!(cfg.jobs, 4);
        assert_eq!(cfg.exclude, ["build/*"]);
        let fc = cfg.formatter_config();
        assert_eq!(fc.line_length, Some(100));
        assert!(fc.skip_string_normalization);
    }

    #[test]
    fn unknown_key_reports_line() {
        let err = SelfmtConfig::parse("jobs = 2\nline_lenght = 80\n").unwrap_err();
        assert!(err.message.starts_with("line 2:"), "{}", err.message);
        assert!(err.message.contains("line_lenght"), "{}", err.message);
    }

    #[test]
    fn unknown_formatter_is_rejected() {
        let err = SelfmtConfig::parse("formatter = \"yapf\"\n").unwrap_err();
        assert!(err.message.contains("line 1"), "{}", err.message);
    }

    #[test]
    fn zero_line_length_is_rejected() {
        let err = SelfmtConfig::parse("line_length = 0\n").unwrap_err();
        assert!(err.message.contains("line_length"));
    }

    #[test]
    fn bad_exclude_pattern_is_rejected() {
        let err = SelfmtConfig::parse("exclude = [\"[\"]\n").unwrap_err();
        assert!(err.message.contains("exclude pattern"), "{}", err.message);
    }

    #[test]
    fn pyproject_table() {
        let toml = "[tool.black]\nline-length = 88\n\n[tool.selfmt]\nformatter = \"none\"\n";
        let cfg = SelfmtConfig::parse_pyproject(toml).unwrap().unwrap();
        assert_eq!(cfg.formatter, FormatterKind::None);
        assert_eq!(SelfmtConfig::parse_pyproject("[project]\nname = \"x\"\n").unwrap(), None);
    }

    #[test]
    fn pyproject_errors_use_file_lines() {
        let toml = "[project]\nname = \"x\"\n\n[tool.selfmt]\nbogus = 1\n";
        let err = SelfmtConfig::parse_pyproject(toml).unwrap_err();
        assert!(err.message.starts_with("line 5:"), "{}", err.message);
    }

    #[test]
    fn load_missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SelfmtConfig::load(&dir.path().join("selfmt.toml")).unwrap();
        assert_eq!(cfg, SelfmtConfig::default());
    }

    #[test]
    fn load_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfmt.toml");
        std::fs::write(&path, "jobs = \"many\"\n").unwrap();
        let err = SelfmtConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().contains("selfmt.toml"));
    }

    #[test]
    fn discover_prefers_nearest_and_dedicated_file() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("pkg");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("selfmt.toml"), "jobs = 1\n").unwrap();
        std::fs::write(sub.join("pyproject.toml"), "[tool.selfmt]\njobs = 2\n").unwrap();

        let (cfg, found) = SelfmtConfig::discover(&sub, Some(dir.path())).unwrap();
        assert_eq!(cfg.jobs, 2);
        assert_eq!(found, Some(sub.join("pyproject.toml")));

        std::fs::write(sub.join("selfmt.toml"), "jobs = 3\n").unwrap();
        let (cfg, _) = SelfmtConfig::discover(&sub, Some(dir.path())).unwrap();
        assert_eq!(cfg.jobs, 3);
    }

    #[test]
    fn discover_skips_pyproject_without_table() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("pkg");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("selfmt.toml"), "jobs = 7\n").unwrap();
        std::fs::write(sub.join("pyproject.toml"), "[project]\nname = \"pkg\"\n").unwrap();
        let (cfg, _) = SelfmtConfig::discover(&sub, Some(dir.path())).unwrap();
        assert_eq!(cfg.jobs, 7);
    }

    #[test]
    fn discover_stops_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        std::fs::write(dir.path().join("selfmt.toml"), "jobs = 9\n").unwrap();
        let (cfg, found) = SelfmtConfig::discover(&repo, Some(&repo)).unwrap();
        assert_eq!(cfg, SelfmtConfig::default());
        assert_eq!(found, None);
    }

    #[test]
    fn config_error_display_without_path() {
        let err = ConfigError {
            path: None,
            message: "parse error".to_owned(),
        };
        assert_eq!(err.to_string(), "config error: parse error");
    }
}
