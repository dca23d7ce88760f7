//! Unified tracing configuration for Quickspell
//!
//! Provides structured logging with dual output to stdout (colored,
//! RUST_LOG-controlled) and a daily-rotated plain-text file, written
//! through a non-blocking worker so logging never stalls the input
//! injection timing.

use once_cell::sync::OnceCell;
use std::sync::Mutex;

use tracing_appender::{
    non_blocking::{NonBlockingBuilder, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Global guard to keep the non-blocking writer alive
static WORKER_GUARD: OnceCell<Mutex<Option<WorkerGuard>>> = OnceCell::new();

/// Initialize the tracing subscriber with dual output:
/// - Stdout: colored, respects RUST_LOG env var
/// - File: plain text, daily rotation, 7 days retention, non-blocking
///
/// Returns Ok(()) on success. The worker guard is stored globally.
pub fn init_tracing(log_dir: &std::path::Path) -> anyhow::Result<()> {
    // Create file appender with daily rotation
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(7)
        .filename_prefix("quickspell")
        .filename_suffix("log")
        .build(log_dir)?;

    // Wrap with non-blocking writer for async performance
    let (non_blocking_writer, guard) = NonBlockingBuilder::default()
        .lossy(false) // Don't drop logs under pressure
        .finish(file_appender);

    // Store guard globally to prevent dropping
    WORKER_GUARD.get_or_init(|| Mutex::new(Some(guard)));

    // Console layer: colored, respects RUST_LOG
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .compact()
        .with_filter(console_filter);

    // File layer: plain text, debug and up
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_writer(non_blocking_writer)
        .with_filter(EnvFilter::new("debug"));

    // Combine layers
    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Tracing initialized, log dir: {}", log_dir.display());

    Ok(())
}
