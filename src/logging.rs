//! Log output for the `journal` binary.
//!
//! Stdout carries the JSON result of a command, so logs never go there.
//! Fallbacks, mirror writes and auth lookups log to stderr by default
//! ([`init_cli`]). With `--log-dir` or `JOURNAL_LOG_DIR` they are also kept
//! as JSON lines in a daily file ([`init_file`]).
//!
//! The level comes from `log_level` in the config (`JOURNAL_LOG_LEVEL`);
//! `RUST_LOG` overrides it.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the file writer alive. Hold it until the command has finished so
/// the fallback warnings of its last engine call are flushed.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr and to `{logs_dir}/journal.log.YYYY-MM-DD` as JSON.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_file(logs_dir: &Path, default_level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "journal.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Log to stderr only. Does nothing when a subscriber is already installed.
pub fn init_cli(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}
