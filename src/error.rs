//! Error taxonomy shared by every public contract point (spec §7).
//!
//! `CacheMiss` is deliberately absent: the spec calls it out as "not an
//! error", just the branch of `LazyLoader::get_workspace` that performs a
//! synchronous load. Internal helpers keep using `anyhow::Result` with
//! `.context(...)`; this enum is for boundaries the UI event loop matches on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultitermError {
    #[error("failed to spawn assistant CLI: {reason}")]
    SpawnFailed { reason: String },

    #[error("write to a session whose child process has already exited")]
    ChildGone,

    #[error("could not decode {detail} of PTY output as UTF-8; skipped")]
    DecodeError { detail: String },

    #[error("failed to persist workspace store: {detail}")]
    PersistenceError { detail: String },

    #[error("workspace store at {path} is corrupt: {detail}")]
    CorruptWorkspace { path: PathBuf, detail: String },

    #[error("session is busy processing the previous command")]
    BusySession,
}

impl MultitermError {
    /// Severity bucket for the notification area (spec §7).
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            MultitermError::BusySession => Severity::Warning,
            MultitermError::DecodeError { .. } => Severity::Warning,
            MultitermError::CorruptWorkspace { .. } => Severity::Warning,
            MultitermError::SpawnFailed { .. }
            | MultitermError::ChildGone
            | MultitermError::PersistenceError { .. } => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}
