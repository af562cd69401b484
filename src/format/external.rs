//! Formatters that run as a subprocess, reading source on stdin and
//! writing the result to stdout.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;

use tracing::{debug, trace};

use super::{Formatter, FormatterConfig, FormatterError, FormatterKind};
use crate::error::SetupError;
use crate::model::TextDocument;

/// `black` or `ruff format`, run once per file.
#[derive(Clone, Debug)]
pub struct ExternalFormatter {
    kind: FormatterKind,
    program: String,
    /// Leading arguments from a command override, e.g. `-m black`.
    prefix: Vec<String>,
}

impl ExternalFormatter {
    #[must_use]
    pub fn new(kind: FormatterKind, command: Option<&str>) -> Self {
        let mut words = command
            .map(|c| c.split_whitespace().map(str::to_owned).collect::<Vec<_>>())
            .unwrap_or_default();
        let program = if words.is_empty() {
            kind.name().to_owned()
        } else {
            words.remove(0)
        };
        Self {
            kind,
            program,
            prefix: words,
        }
    }

    /// The full argument list for formatting `path`.
    #[must_use]
    pub fn args(&self, path: &Path, config: &FormatterConfig) -> Vec<String> {
        let mut args = self.prefix.clone();
        if self.kind == FormatterKind::Ruff {
            args.push("format".to_owned());
        }
        args.push("--quiet".to_owned());
        if let Some(n) = config.line_length {
            args.push("--line-length".to_owned());
            args.push(n.to_string());
        }
        if self.kind == FormatterKind::Black {
            if config.skip_string_normalization {
                args.push("--skip-string-normalization".to_owned());
            }
            for version in &config.target_versions {
                args.push("--target-version".to_owned());
                args.push(version.clone());
            }
        }
        args.push("--stdin-filename".to_owned());
        args.push(path.display().to_string());
        args.push("-".to_owned());
        args
    }

    fn spawn_error(&self, source: io::Error) -> FormatterError {
        FormatterError::Spawn {
            formatter: self.kind.name(),
            source,
        }
    }

    /// Run the formatter with `input` on stdin. Stdin is fed from its own
    /// thread so a formatter that fills its stdout pipe cannot deadlock us.
    fn run(&self, args: &[String], input: &[u8]) -> Result<Output, FormatterError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let Some(mut stdin) = child.stdin.take() else {
            return Err(self.spawn_error(io::Error::other("stdin was not captured")));
        };

        thread::scope(|s| {
            let writer = s.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output().map_err(|e| self.spawn_error(e))?;
            match writer.join() {
                Ok(Ok(())) => {}
                // The formatter may exit before reading everything; its exit
                // status says what happened.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(self.spawn_error(e)),
                Err(_) => {
                    return Err(self.spawn_error(io::Error::other("stdin writer panicked")));
                }
            }
            Ok(output)
        })
    }
}

impl Formatter for ExternalFormatter {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn check_available(&self) -> Result<(), SetupError> {
        let missing = |reason: String| SetupError::MissingDependency {
            formatter: self.kind.name(),
            binary: self.program.clone(),
            reason,
        };
        let output = Command::new(&self.program)
            .args(&self.prefix)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| missing(e.to_string()))?;
        if !output.status.success() {
            return Err(missing(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!(
            formatter = self.kind.name(),
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "formatter available"
        );
        Ok(())
    }

    fn format(
        &self,
        path: &Path,
        source: &TextDocument,
        config: &FormatterConfig,
    ) -> Result<TextDocument, FormatterError> {
        let formatter = self.kind.name();
        let input = source
            .to_bytes()
            .map_err(|source| FormatterError::Input { formatter, source })?;
        let args = self.args(path, config);
        trace!(program = %self.program, ?args, "running formatter");

        let output = self.run(&args, &input)?;
        if !output.status.success() {
            return Err(FormatterError::Failed {
                formatter,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let formatted = TextDocument::from_bytes(&output.stdout)
            .map_err(|source| FormatterError::Output { formatter, source })?;
        Ok(TextDocument::from_lines(
            formatted.lines().iter().cloned(),
            formatted.newline(),
            formatted.has_trailing_newline(),
            source.encoding(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FormatterConfig {
        FormatterConfig {
            line_length: Some(100),
            skip_string_normalization: true,
            target_versions: vec!["py38".to_owned(), "py39".to_owned()],
        }
    }

    #[test]
    fn black_arguments() {
        let black = ExternalFormatter::new(FormatterKind::Black, None);
        assert_eq!(
            black.args(Path::new("src/a.py"), &config()),
            [
                "--quiet",
                "--line-length",
                "100",
                "--skip-string-normalization",
                "--target-version",
                "py38",
                "--target-version",
                "py39",
                "--stdin-filename",
                "src/a.py",
                "-",
            ]
        );
    }

    #[test]
    fn ruff_arguments_skip_black_only_flags() {
        let ruff = ExternalFormatter::new(FormatterKind::Ruff, None);
        assert_eq!(
            ruff.args(Path::new("a.py"), &config()),
            [
                "format",
                "--quiet",
                "--line-length",
                "100",
                "--stdin-filename",
                "a.py",
                "-"
            ]
        );
    }

    #[test]
    fn command_override_splits_words() {
        let black = ExternalFormatter::new(FormatterKind::Black, Some("python3 -m black"));
        assert_eq!(black.program, "python3");
        let args = black.args(Path::new("a.py"), &FormatterConfig::default());
        assert_eq!(args[..3], ["-m", "black", "--quiet"]);
    }

    #[test]
    fn missing_binary_is_a_setup_error() {
        let black = ExternalFormatter::new(
            FormatterKind::Black,
            Some("selfmt-test-no-such-formatter-binary"),
        );
        let err = black.check_available().unwrap_err();
        assert!(matches!(err, SetupError::MissingDependency { .. }), "{err}");
    }

    #[test]
    fn missing_binary_fails_the_file() {
        let ruff = ExternalFormatter::new(
            FormatterKind::Ruff,
            Some("selfmt-test-no-such-formatter-binary"),
        );
        let doc = TextDocument::from_text("x = 1\n").unwrap();
        let err = ruff
            .format(Path::new("a.py"), &doc, &FormatterConfig::default())
            .unwrap_err();
        assert!(matches!(err, FormatterError::Spawn { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn subprocess_output_is_decoded() {
        // `cat` echoes stdin when given `-`; the other arguments are treated
        // as files, so use `sh -c` to ignore them.
        let fmt = ExternalFormatter::new(FormatterKind::Ruff, Some("sh -c cat"));
        let doc = TextDocument::from_text("x = 1\r\ny = 2\r\n").unwrap();
        let out = fmt
            .format(Path::new("a.py"), &doc, &FormatterConfig::default())
            .unwrap();
        assert_eq!(out, doc);
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_reported() {
        let fmt = ExternalFormatter::new(FormatterKind::Black, Some("false"));
        let doc = TextDocument::from_text("x = 1\n").unwrap();
        let err = fmt
            .format(Path::new("a.py"), &doc, &FormatterConfig::default())
            .unwrap_err();
        assert!(matches!(err, FormatterError::Failed { .. }), "{err}");
    }
}
