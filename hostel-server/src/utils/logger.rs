//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level. With a log directory the same
//! events are also written to a daily rolling file.

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Initialize the logger with optional JSON output and file output
pub fn init_logger_with_file(log_level: &str, json: bool, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_target(false)
            .boxed()
    };

    let file_layer = log_dir.and_then(|dir| {
        let log_path = Path::new(dir);
        if let Err(e) = std::fs::create_dir_all(log_path) {
            eprintln!("Failed to create log directory {dir}: {e}");
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(log_path, "hostel-server.log");
        Some(fmt::layer().with_ansi(false).with_writer(file_appender))
    });

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Logger already initialized: {e}");
    }
}
