use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: stdout plus a daily rolling file named
/// after `file_prefix` under the data directory's `logs/`.
///
/// Later calls are no-ops.
pub fn init(paths: &AppPaths, file_prefix: &str) {
    let appender = file_appender(&paths.log_dir, file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}

fn file_appender(log_dir: &Path, file_prefix: &str) -> RollingFileAppender {
    let _ = std::fs::create_dir_all(log_dir);
    tracing_appender::rolling::daily(log_dir, file_prefix)
}
