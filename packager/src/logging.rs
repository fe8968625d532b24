//! Stderr logging for the packager binary.
//!
//! The library logs through the `log` facade. The binary installs a
//! `tracing-subscriber` formatter on stderr, which also captures `log`
//! records, so the release summary on stdout stays machine-readable.

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*};

/// Map `-v` occurrences and `--quiet` to a log level filter.
///
/// Warnings are shown by default; each `-v` adds one level of detail up to
/// `trace`, while `--quiet` limits output to errors.
///
/// # Examples
///
/// ```
/// use pulsar_packager::logging::level_for;
/// use tracing_subscriber::filter::LevelFilter;
///
/// assert_eq!(level_for(0, false), LevelFilter::WARN);
/// assert_eq!(level_for(2, false), LevelFilter::DEBUG);
/// assert_eq!(level_for(0, true), LevelFilter::ERROR);
/// ```
#[must_use]
pub const fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the stderr subscriber at the given level.
///
/// `log` records from the library are forwarded to the subscriber.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber or logger has already
/// been installed.
pub fn init(level: LevelFilter) -> Result<(), TryInitError> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time();
    tracing_subscriber::registry()
        .with(layer.with_filter(level))
        .try_init()
}
