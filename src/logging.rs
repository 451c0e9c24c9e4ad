/// Structured logging setup using tracing
///
/// Writes to stderr. Auto-detects format: human-readable with ANSI colors when
/// stderr is a terminal, structured JSON when piped/redirected. An optional
/// JSON file sink is layered on top when `log_file` is configured.

use std::io::IsTerminal;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};
use crate::config::Config;

/// Initialize tracing subscriber
///
/// Log level from config.log_level (default: info)
/// RUST_LOG env var can override at runtime
///
/// The returned guard flushes the file sink on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = if std::io::stderr().is_terminal() {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .boxed()
    };

    let (file_layer, guard) = match config.log_file.as_deref().map(file_writer) {
        Some((writer, guard)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn file_writer(log_file: &str) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let path = Path::new(log_file);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "pagesearch.log".into());

    let appender = tracing_appender::rolling::never(directory, file_name);
    tracing_appender::non_blocking(appender)
}
