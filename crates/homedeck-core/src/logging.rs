//! Logging configuration using tracing

use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable that overrides the log filter.
pub const LOG_ENV_VAR: &str = "HOMEDECK_LOG";

/// Filter used when neither the environment nor the config file sets one.
pub const DEFAULT_FILTER: &str = "homedeck=info,warn";

/// File name prefix for the daily rolling log.
const LOG_FILE_PREFIX: &str = "homedeck.log";

/// Initialize the logging subsystem
///
/// Logs are written to `log_dir` (created if missing), rotated daily. The
/// plugin has no terminal attached, so the file is the only sink.
/// `HOMEDECK_LOG` takes priority over `filter`.
///
/// # Examples
/// ```bash
/// HOMEDECK_LOG=debug ./homedeck -port 28196 ...
/// ```
pub fn init(log_dir: &Path, filter: Option<&str>) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);

    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("homedeck plugin starting");
    tracing::info!("Log file: {}", current_log_file(log_dir).display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Path of the log file for the current day inside `log_dir`.
///
/// The appender rolls over at midnight UTC, so the suffix is the UTC date.
pub fn current_log_file(log_dir: &Path) -> PathBuf {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    log_dir.join(format!("{LOG_FILE_PREFIX}.{today}"))
}
