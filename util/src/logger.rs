//! Generic logger utility functions
//!
//! Records go to the terminal with coloured level tags and to the session's log file as plain
//! text. Both carry the number of seconds since the session epoch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern::{Dispatch, FormatCallback};
use log::{self, info, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Crate prefixes stripped from record targets before they are printed.
const TARGET_PREFIXES: [&str; 2] = ["gonio_lib::", "gonio_exec::"];

/// Targets whose verbosity is capped regardless of the requested level.
///
/// The motion controller traces every tick and the sweep every sample, which would drown out
/// everything else during a long measurement.
const CAPPED_TARGETS: [(&str, LevelFilter); 2] = [
    ("gonio_lib::motion_ctrl", LevelFilter::Debug),
    ("gonio_lib::sweep", LevelFilter::Debug),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `min_level` must be greater than `log::Level::Info`.
/// - Per-tick motion and per-sample sweep tracing is capped at `Debug`, even
///   when `min_level` is `Trace`.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let dispatch = CAPPED_TARGETS
        .iter()
        .fold(Dispatch::new().level(min_level), |d, &(target, cap)| {
            d.level_for(target, min_level.min(cap))
        });

    dispatch
        .chain(
            Dispatch::new()
                .format(|out, message, record| format_record(out, message, record, true))
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(|out, message, record| format_record(out, message, record, false))
                .chain(log_file),
        )
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn format_record(out: FormatCallback, message: &Arguments, record: &Record, coloured: bool) {
    let tag = level_to_str(record.level(), coloured);

    // If debug or trace include the target, otherwise don't include it
    if record.level() > log::Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            tag,
            short_target(record.target()),
            message
        ))
    } else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            tag,
            message
        ))
    }
}

/// Strip the crate prefix from a record target, `gonio_lib::sweep::state` becomes
/// `sweep::state`.
fn short_target(target: &str) -> &str {
    TARGET_PREFIXES
        .iter()
        .find_map(|p| target.strip_prefix(p))
        .unwrap_or(target)
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level, coloured: bool) -> ColoredString {
    let tag = match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    };

    if !coloured {
        return tag.normal();
    }

    match level {
        log::Level::Trace => tag.dimmed().italic(),
        log::Level::Debug => tag.dimmed(),
        log::Level::Info => tag.normal(),
        log::Level::Warn => tag.yellow(),
        log::Level::Error => tag.red().bold(),
    }
}
