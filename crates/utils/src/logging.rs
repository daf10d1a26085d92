//! provides logging helpers

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Environment variable naming a log file; when set, logs are mirrored into a
/// daily rolling file next to it.
pub const LOG_PATH_ENV_VAR: &str = "AUTOSCALE_LOG_PATH";

/// initiate the global tracing subscriber
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the process.
pub fn init() -> Option<WorkerGuard> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let stderr_layer = layer().with_writer(std::io::stderr).with_target(true);

    let (file_layer, guard) = match env::var(LOG_PATH_ENV_VAR).ok() {
        Some(log_path) => match rolling_file_writer(Path::new(&log_path)) {
            Some((writer, guard)) => (
                Some(layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            ),
            None => (None, None),
        },
        None => (None, None),
    };

    registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

fn rolling_file_writer(log_path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    let dir = log_path.parent().unwrap_or(Path::new("."));
    let file_name = log_path.file_name()?.to_str()?;

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(3)
        .build(dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            // the subscriber is not installed yet
            eprintln!("failed to create rolling log file in {}: {e}", dir.display());
            return None;
        }
    };

    Some(tracing_appender::non_blocking(appender))
}
