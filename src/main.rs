use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use tracing::error;

use selfmt::config::SelfmtConfig;
use selfmt::files::collect_files;
use selfmt::format::FormatterKind;
use selfmt::pipeline::RunContext;
use selfmt::pool::WorkerPool;
use selfmt::report::{self, Mode, RunReport};
use selfmt::snapshot::{GitSnapshots, RevisionRange};
use selfmt::telemetry;

/// Reformat only the Python lines you edited
///
/// selfmt compares each file between two revisions, runs a code formatter
/// over the whole file, and keeps the formatter's changes only where they
/// touch lines edited between the two. Every result must parse into the
/// same syntax tree as the file as edited, or the file is left alone.
///
/// REVISIONS:
///
///   -r HEAD            uncommitted changes (default)
///   -r main            everything since main, plus uncommitted changes
///   -r main...         changes since the branch point from main
///   -r v1.0..v1.1      two commits (needs --diff, --check or --stdout)
///   -r :PRE-COMMIT:    the range the pre-commit framework passes in
#[derive(Parser, Debug)]
#[command(name = "selfmt", version, about)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Files or directories to process (default: current directory)
    paths: Vec<PathBuf>,

    /// Revision range to compare [default: HEAD]
    #[arg(short, long, value_name = "REV")]
    revision: Option<String>,

    /// Formatter to apply [default: black]
    #[arg(short, long, value_enum)]
    formatter: Option<FormatterKind>,

    /// Maximum line length passed to the formatter
    #[arg(short = 'l', long, value_name = "N")]
    line_length: Option<u32>,

    /// Don't normalize string quotes or prefixes (black)
    #[arg(short = 'S', long)]
    skip_string_normalization: bool,

    /// Python version the output must support (black, repeatable)
    #[arg(short = 't', long = "target-version", value_name = "VERSION")]
    target_versions: Vec<String>,

    /// Worker threads; 0 means one per core
    #[arg(short, long, value_name = "N", env = "SELFMT_JOBS")]
    jobs: Option<usize>,

    /// Don't write files; exit 1 if any file would change
    #[arg(long, conflicts_with_all = ["diff", "stdout"])]
    check: bool,

    /// Don't write files; print a unified diff of the changes
    #[arg(long, conflicts_with = "stdout")]
    diff: bool,

    /// Print the result for a single file instead of writing it
    #[arg(long)]
    stdout: bool,

    /// Print a machine-readable summary on stdout
    #[arg(long, conflicts_with_all = ["diff", "stdout"])]
    json: bool,

    /// Configuration file [default: selfmt.toml or pyproject.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More logging (repeatable)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,
}

impl Cli {
    const fn mode(&self) -> Mode {
        if self.check {
            Mode::Check
        } else if self.diff {
            Mode::Diff
        } else if self.stdout {
            Mode::Stdout
        } else {
            Mode::Write
        }
    }

    fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            i8::try_from(self.verbose).unwrap_or(i8::MAX)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "selfmt", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }
    telemetry::init(cli.verbosity());

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(report::exit::FAILURE)
        }
    }
}

fn load_config(cli: &Cli, cwd: &Path, root: &Path) -> Result<SelfmtConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} not found", path.display());
            }
            SelfmtConfig::load(path)?
        }
        None => SelfmtConfig::discover(cwd, Some(root))?.0,
    };

    if let Some(revision) = &cli.revision {
        config.revision.clone_from(revision);
    }
    if let Some(formatter) = cli.formatter {
        config.formatter = formatter;
    }
    if cli.line_length.is_some() {
        config.line_length = cli.line_length;
    }
    if cli.skip_string_normalization {
        config.skip_string_normalization = true;
    }
    if !cli.target_versions.is_empty() {
        config.target_versions.clone_from(&cli.target_versions);
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<u8> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let snapshots =
        GitSnapshots::discover(&cwd).context("selfmt must run inside a git working tree")?;
    let root = snapshots.root().to_path_buf();
    let config = load_config(cli, &cwd, &root)?;
    let mode = cli.mode();

    let resolved = RevisionRange::parse(&config.revision)
        .resolve(&snapshots.repo())
        .with_context(|| format!("cannot resolve revision range `{}`", config.revision))?;
    if mode.writes() && !resolved.target.is_worktree() {
        bail!(
            "the target of `{}` is a commit and cannot be rewritten\n  \
             To fix: add --diff, --check or --stdout.",
            config.revision
        );
    }

    let formatter = config
        .formatter
        .build(config.formatter_command.as_deref());
    formatter.check_available()?;

    let inputs = if cli.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.paths.clone()
    };
    let files = collect_files(&root, &cwd, &inputs, &config.exclude_patterns()?)?;
    if mode == Mode::Stdout && files.len() != 1 {
        bail!("--stdout needs exactly one file, got {}", files.len());
    }

    let formatter_config = config.formatter_config();
    let ctx = RunContext {
        snapshots: &snapshots,
        formatter: &*formatter,
        formatter_config: &formatter_config,
        range: resolved,
    };
    let results = ctx.run(WorkerPool::new(config.jobs), &files);

    let human = !cli.json && !cli.quiet;
    let mut report = RunReport::new(mode);
    let mut stdout = std::io::stdout().lock();
    for result in &results {
        report.record(result);
        let Ok(outcome) = result else { continue };
        match mode {
            Mode::Write => match ctx.write_back(outcome) {
                Ok(true) if human => eprintln!("reformatted {}", outcome.path.display()),
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "cannot write file");
                    report.mark_failed(&e);
                }
            },
            Mode::Check => {
                if outcome.changed && human {
                    eprintln!("would reformat {}", outcome.path.display());
                }
            }
            Mode::Diff => {
                if !cli.json {
                    stdout.write_all(report::unified_diff(outcome).as_bytes())?;
                }
            }
            Mode::Stdout => stdout.write_all(&outcome.merged.to_bytes()?)?,
        }
    }

    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else if human && mode != Mode::Stdout {
        eprintln!("{}", report.summary());
    }
    stdout.flush()?;
    Ok(report.exit_code())
}
