//! Diagnostics logging initialization
//!
//! The crate reports its own soft failures (unreadable sources, restarted
//! timers, sessions left open) through `tracing`. Hosts without a subscriber
//! of their own can install this one, which writes them next to the debug
//! log.

use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DebugLogConfig;

/// File name prefix of the daily-rolled diagnostics log.
pub const DIAGNOSTICS_FILE: &str = "debuglog-diagnostics.log";

/// Initialize diagnostics logging
///
/// Sets up:
/// - Daily-rolled `debuglog-diagnostics.log` in the configured log directory
/// - Filter from `RUST_LOG`, falling back to the configured directive
/// - Non-blocking, ANSI-free writes
///
/// Keep the returned guard alive for as long as diagnostics should be
/// flushed. If a global subscriber is already installed it is left in place
/// and the guard only owns an idle writer.
pub fn init(config: &DebugLogConfig) -> io::Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, DIAGNOSTICS_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.diagnostics_filter))
        .unwrap_or_else(|_| EnvFilter::new("lib_debuglog=info,warn"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            log_file = %config.log_path().display(),
            log_dir = %config.log_dir.display(),
            enabled = config.enabled,
            memory_warning_mb = config.memory_limit_warning_mb,
            time_warning_secs = config.execution_time_warning_secs,
            "Debug log diagnostics initialized"
        );
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = DebugLogConfig::default().with_log_dir(tmp.path().join("nested/logs"));

        let guard = init(&config).unwrap();

        assert!(config.log_dir.is_dir());
        drop(guard);
    }
}
