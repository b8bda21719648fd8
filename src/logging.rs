//! Logging configuration and initialization for drivebox.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the filter shared by both initializers.
///
/// `RUST_LOG` directives win over the configured level; sqlx statement
/// logging is capped at warn unless asked for explicitly.
fn build_filter(level: &str) -> EnvFilter {
    let level = parse_level(level);
    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    if std::env::var("RUST_LOG").is_err() {
        if let Ok(directive) = "sqlx=warn".parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initialize the logging system with the given configuration.
///
/// Logs go to stdout and, when `config.file` is non-empty, are appended to
/// that file as well.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level);

    if config.file.is_empty() {
        init_console_only(&config.level);
        return Ok(());
    }

    if let Some(parent) = Path::new(&config.file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;
    let writer = std::io::stdout.and(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();

    Ok(())
}

/// Initialize console-only logging (for development/testing).
pub fn init_console_only(level: &str) {
    let filter = build_filter(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(true),
        )
        .with(filter)
        .init();
}
