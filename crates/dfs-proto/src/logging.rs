//! Shared `tracing` setup for every role's binary.
//!
//! Replaces the out-of-scope `Log_Flusher_Thread`/truncate-on-startup
//! behavior (spec §6, §2) with a `tracing-appender` non-blocking,
//! daily-rolling file writer: the appender's background worker thread
//! plays the same role the teacher's dedicated flusher thread would,
//! batching writes and flushing them periodically instead of after
//! every line.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Initializes `tracing` for a role binary, logging to both stderr and
/// a rolling file named `<role>.log` inside `log_dir`.
///
/// The returned [`WorkerGuard`] must be held for the lifetime of the
/// process: dropping it flushes and joins the background writer.
pub fn init(role: &str, log_dir: impl AsRef<std::path::Path>) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never(log_dir, format!("{role}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking.and(std::io::stderr))
        .init();

    guard
}
