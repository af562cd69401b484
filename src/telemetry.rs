//! Logging initialization.
//!
//! Events go to stderr. The level comes from `-v`/`-q` unless `SELFMT_LOG`
//! is set, in which case it is read as an [`EnvFilter`] directive
//! (e.g. `SELFMT_LOG=selfmt::reconcile=debug`). `SELFMT_LOG_FORMAT=json`
//! switches to one JSON object per event, with per-file spans closed as
//! they finish.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "SELFMT_LOG";
/// Environment variable selecting the output format (`text` or `json`).
pub const LOG_FORMAT_ENV: &str = "SELFMT_LOG_FORMAT";

/// The default filter directive for a verbosity level: `-1` for `--quiet`,
/// `0` by default, and one step more per `-v`.
#[must_use]
pub const fn level_for(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-1 => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init(verbosity: i8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
}
