//! Tracing subscriber setup
//!
//! Console output is always enabled; when `logging.log_file` is set a second
//! layer writes to that file through a non-blocking appender. The returned
//! [`WorkerGuard`] must be held until exit so buffered lines are flushed.

use std::path::Path;
use taskpilot_core::LoggingConfig;
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Invalid log file path: {0}")]
    InvalidPath(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, LoggingError>;

/// Directive used when `RUST_LOG` is not set
///
/// `--verbose` raises the crate's own targets to `debug` without making the
/// HTTP and SQL stacks noisy.
#[must_use]
pub fn default_directive(level: &str, verbose: bool) -> String {
    if verbose {
        format!("{level},taskpilot_core=debug,taskpilot_cli=debug")
    } else {
        level.to_string()
    }
}

/// Build the filter, preferring `RUST_LOG` when present
///
/// # Errors
/// Returns an error when the configured directive does not parse
pub fn build_filter(level: &str, verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = default_directive(level, verbose);
    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive,
        message: e.to_string(),
    })
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error for a bad filter, a log path without a file name, or when
/// a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(&config.level, verbose)?;

    let console = if config.json_logs {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = if config.json_logs {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    if let Some(path) = &config.log_file {
        info!(path = %path.display(), "File logging initialized");
    }
    Ok(guard)
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("warn", false), "warn");
        assert_eq!(
            default_directive("info", true),
            "info,taskpilot_core=debug,taskpilot_cli=debug"
        );
    }

    #[test]
    #[serial]
    fn test_build_filter_rejects_garbage() {
        std::env::remove_var("RUST_LOG");
        let err = build_filter("taskpilot=loudest", false).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
    }

    #[test]
    #[serial]
    fn test_build_filter_accepts_level() {
        std::env::remove_var("RUST_LOG");
        assert!(build_filter("debug", true).is_ok());
    }

    #[test]
    fn test_file_writer_rejects_directory_path() {
        let err = file_writer(&PathBuf::from("/")).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidPath(_)));
    }

    #[test]
    fn test_file_writer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskpilot.log");
        let (_writer, guard) = file_writer(&path).unwrap();
        drop(guard);
        assert!(path.exists());
    }
}
