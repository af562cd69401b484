//! Formatter plugins.
//!
//! A [`Formatter`] turns a whole document into its formatted version. The
//! engine never cares how: it only diffs the output against the input.
//! The set of formatters is closed ([`FormatterKind`]) and resolved once at
//! startup into a boxed trait object shared by every worker.

mod external;

use std::fmt;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::error::SetupError;
use crate::model::{DecodeError, TextDocument};

pub use external::ExternalFormatter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Options forwarded to the formatter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatterConfig {
    pub line_length: Option<u32>,
    pub skip_string_normalization: bool,
    pub target_versions: Vec<String>,
}

/// The supported formatters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    #[default]
    Black,
    Ruff,
    /// Identity: the candidate is the input.
    None,
}

impl FormatterKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Ruff => "ruff",
            Self::None => "none",
        }
    }

    /// Build the formatter, optionally overriding the command that runs it
    /// (e.g. `"python -m black"`).
    #[must_use]
    pub fn build(self, command: Option<&str>) -> Box<dyn Formatter> {
        match self {
            Self::Black | Self::Ruff => Box::new(ExternalFormatter::new(self, command)),
            Self::None => Box::new(IdentityFormatter),
        }
    }
}

impl fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A formatter failed on one file.
#[derive(Debug, Error)]
pub enum FormatterError {
    #[error("failed to run {formatter}: {source}")]
    Spawn {
        formatter: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{formatter} exited with {status}: {stderr}")]
    Failed {
        formatter: &'static str,
        status: String,
        stderr: String,
    },

    #[error("{formatter} produced undecodable output: {source}")]
    Output {
        formatter: &'static str,
        #[source]
        source: DecodeError,
    },

    #[error("cannot encode input for {formatter}: {source}")]
    Input {
        formatter: &'static str,
        #[source]
        source: DecodeError,
    },
}

// ---------------------------------------------------------------------------
// Formatter trait
// ---------------------------------------------------------------------------

/// A whole-file code formatter.
pub trait Formatter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check the formatter can run at all. Called once before any file is
    /// processed.
    ///
    /// # Errors
    /// [`SetupError::MissingDependency`] if it cannot.
    fn check_available(&self) -> Result<(), SetupError>;

    /// Format `source`, which lives at `path` in the repository.
    ///
    /// The result carries `source`'s encoding.
    ///
    /// # Errors
    /// A [`FormatterError`] if the formatter fails on this file.
    fn format(
        &self,
        path: &Path,
        source: &TextDocument,
        config: &FormatterConfig,
    ) -> Result<TextDocument, FormatterError>;
}

/// The `none` formatter.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityFormatter;

impl Formatter for IdentityFormatter {
    fn name(&self) -> &'static str {
        FormatterKind::None.name()
    }

    fn check_available(&self) -> Result<(), SetupError> {
        Ok(())
    }

    fn format(
        &self,
        _path: &Path,
        source: &TextDocument,
        _config: &FormatterConfig,
    ) -> Result<TextDocument, FormatterError> {
        Ok(source.clone())
    }
}
