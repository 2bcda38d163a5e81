//! Logging configuration for sql-boxcar.
//!
//! Logs go to stderr by default, or to a file when one is configured so that
//! structured output on stdout stays clean.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Maximum length of an error message logged when a run is rolled back.
pub const DIAGNOSTIC_MESSAGE_LEN: usize = 60;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to the given file.
///
/// The file is truncated on each run. Falls back to stderr logging when the
/// file cannot be created.
pub fn init_file_logging(log_path: &Path) {
    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    let log_file = match File::create(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Returns the default path for the log file.
///
/// Uses the XDG state directory on Linux, or falls back to the config
/// directory on other platforms.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("sql-boxcar").join("sql-boxcar.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("sql-boxcar").join("sql-boxcar.log");
    }

    std::env::temp_dir().join("sql-boxcar.log")
}

/// Truncates a diagnostic message to at most `max_chars` characters,
/// appending an ellipsis when anything was cut.
pub fn truncate_for_log(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{} ...", &message[..cut]),
        None => message.to_string(),
    }
}
