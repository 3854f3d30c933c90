//! Log output for phytostress
//!
//! Events go to a daily rolling file, `phytostress.log.<date>`, in
//! `[logging] directory` or the XDG state directory
//! (`~/.local/state/phytostress/`). Standard output stays free for command
//! results. `RUST_LOG` takes precedence over `[logging] level`.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of the rolling log file names
pub const LOG_FILE_PREFIX: &str = "phytostress.log";

/// Keeps the background log writer alive; pending lines are flushed on drop.
#[must_use = "logging stops when the guard is dropped"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Event filter from `RUST_LOG`, else the configured level.
///
/// A configured level that does not parse is a configuration error rather
/// than a silent fallback.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("invalid logging.level '{}': {}", level, e)))
}

/// Install the global subscriber writing to the rolling log file
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = build_filter(&config.level)?;
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(config.max_files)
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("cannot log to {}: {}", log_dir.display(), e)))?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _worker: worker,
        log_dir,
    })
}

/// Route events to the test harness output; safe to call from every test
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("phytostress_core=debug"))
        .with_test_writer()
        .try_init();
}
