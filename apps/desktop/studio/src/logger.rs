//! Logging for the studio host process.
//!
//! Colored stdout plus a plain `studio.log` file. Initialization runs once per
//! process; later calls are a logged no-op.

use crate::error::StudioError;

use common::ErrorLocation;

use std::fmt::Arguments;
use std::fs::create_dir_all;
use std::io::stdout;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "studio.log";

/// Overrides the build-default level, e.g. `STUDIO_LOG=trace`.
pub const LOG_LEVEL_ENV: &str = "STUDIO_LOG";

#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Dependencies that log every frame or request at debug level.
const QUIET_MODULES: [&str; 4] = ["tungstenite", "tokio_tungstenite", "hyper_util", "reqwest"];

/// Initialize the logger with dual output (stdout + `{log_dir}/studio.log`).
///
/// Creates `log_dir` if needed. Safe to call more than once.
///
/// # Errors
///
/// Returns [`StudioError::Studio`] if the directory or log file cannot be
/// created, or if another global logger is already installed.
pub fn initialize(log_dir: &Path) -> Result<(), StudioError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        let level = level_from_env();
        result = initialize_internal(log_dir, level);
        if result.is_ok() {
            info!(
                "Logger initialized with level {level:?}, writing {}",
                log_file_path(log_dir).display()
            );
        }
    });

    result
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Level from [`LOG_LEVEL_ENV`], falling back to the build default when unset or unparsable.
pub fn level_from_env() -> LevelFilter {
    parse_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref())
}

pub(crate) fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

#[track_caller]
pub(crate) fn initialize_internal(log_dir: &Path, level: LevelFilter) -> Result<(), StudioError> {
    create_dir_all(log_dir).map_err(|e| StudioError::Studio {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let log_file = fern::log_file(log_file_path(log_dir)).map_err(|e| StudioError::Studio {
        message: format!("Failed to create log file: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            write_line(out, message, record, colors.color(record.level()))
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(|out, message, record| write_line(out, message, record, record.level()))
        .chain(log_file);

    let mut base_dispatch = Dispatch::new().level(level);
    for module in QUIET_MODULES {
        base_dispatch = base_dispatch.level_for(module, level.min(LevelFilter::Warn));
    }

    base_dispatch
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| StudioError::Studio {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(())
}

fn write_line(
    out: FormatCallback<'_>,
    message: &Arguments<'_>,
    record: &Record<'_>,
    level: impl std::fmt::Display,
) {
    out.finish(format_args!(
        "[{date} - {level}] {message} [{file}:{line}]",
        date = format_rfc3339(SystemTime::now()),
        file = record.file().unwrap_or("unknown"),
        line = record.line().unwrap_or(0),
    ))
}
