//! Structured logging setup so background I/O errors are never silently swallowed.
//!
//! PTY reader threads and the lazy-loader background worker never surface
//! errors to the UI thread as panics or exceptions (spec §7): they log here,
//! and the event loop separately decides whether to also show a notification.

use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::data_dir;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_FILE_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the file-backed tracing subscriber. Idempotent: safe to call
/// more than once (e.g. once from `main`, once from a test harness).
pub fn init_logging() {
    if LOG_GUARD.get().is_some() {
        return;
    }

    let log_dir = data_dir().join("logs");
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!("multiterm: failed to create log dir {}: {err}", log_dir.display());
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "multiterm.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("MULTITERM_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if cfg!(debug_assertions) { "debug" } else { "info" }));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .json()
        .with_current_span(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = LOG_GUARD.set(guard);
        let _ = LOG_FILE_PATH.set(log_dir.join("multiterm.log"));
        install_panic_hook();
    }
}

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "panic");
        previous(info);
    }));
}

/// Best-effort path to the active log file, for user-facing error messages.
#[must_use]
pub fn log_file_path() -> PathBuf {
    LOG_FILE_PATH
        .get()
        .cloned()
        .unwrap_or_else(|| data_dir().join("logs").join("multiterm.log"))
}

pub fn log_debug(message: &str) {
    tracing::debug!("{message}");
}

pub fn log_warn(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}
