//! Logging infrastructure for pipeline runs
//!
//! Logs go to the console and to rotating files in a log directory
//! (`logs/` by default).
//!
//! ## Files
//!
//! - `running_logs.<date>.log`: every event at the active level
//! - `error.<date>.log`: warnings and errors only, so an operator can see at a
//!   glance which stage failed and which categorical values fell back
//!
//! Both rotate daily, keeping 10 old files.
//!
//! ## Usage
//!
//! ```no_run
//! use diabetes_risk::logging;
//! use std::path::Path;
//!
//! logging::init(Path::new("logs")).expect("Failed to initialize logging");
//!
//! tracing::info!("Pipeline started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Default directory for log files, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Creates the log directory if needed and returns it.
pub fn ensure_log_dir(log_dir: &Path) -> Result<PathBuf> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir.to_path_buf())
}

/// Initializes the logging system with console and file output.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the file
/// appenders fail to open.
pub fn init(log_dir: &Path) -> Result<()> {
    let log_dir = ensure_log_dir(log_dir)?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("running_logs")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create running-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create error-logs file appender")?;

    // INFO unless RUST_LOG says otherwise
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .pretty();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_log_dir_creates_nested_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("a").join("logs");
        let dir = ensure_log_dir(&nested).expect("Failed to create log dir");
        assert!(dir.is_dir());
    }
}
