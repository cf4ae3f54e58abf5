use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directives, e.g. `YUP_LOG=yup_supervisor=debug`.
const LOG_FILTER_VAR: &str = "YUP_LOG";
/// Directory for daily-rotated JSON logs, in addition to stderr.
const LOG_DIR_VAR: &str = "YUP_LOG_DIR";

/// Installs the global subscriber. Keep the guard alive until exit so file logs are flushed.
pub fn init() -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

    // Human-readable events go to stderr; stdout belongs to the tool.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_VAR).map(PathBuf::from) {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir).with_context(|| {
                format!("failed to create log directory {}", log_dir.display())
            })?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(7)
                .filename_prefix("yup")
                .filename_suffix("log")
                .build(&log_dir)
                .context("failed to create rolling file appender")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install the log subscriber")?;

    Ok(guard)
}
