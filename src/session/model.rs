//! Session identity and the idle/processing/responding/completed state machine (spec §4.B).

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable session identifier. Also used as the on-disk sessions
/// subdirectory name, so the assistant CLI's per-directory conversation
/// state survives process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_dirname(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Per-session lifecycle state (spec §4.B's state diagram).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Processing,
    Responding,
    Completed,
    Terminated,
    /// Session card created, but the assistant CLI never spawned.
    Failed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_hint(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Processing => "processing",
            SessionStatus::Responding => "responding",
            SessionStatus::Completed => "completed",
            SessionStatus::Terminated => "terminated",
            SessionStatus::Failed => "failed",
        }
    }

    /// Busy sessions reject a new `submit_command` (spec §4.B).
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Processing | SessionStatus::Responding)
    }
}

/// Bookkeeping for the currently in-flight command, reset each time a new
/// command is submitted.
#[derive(Debug, Clone)]
pub struct ActiveCommand {
    pub started_at: Instant,
    pub last_output_at: Instant,
    pub bytes_received: u64,
    /// Distinct status strings seen this cycle (spec §4.C.3 step count).
    pub step_count: usize,
}

impl ActiveCommand {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        ActiveCommand {
            started_at: now,
            last_output_at: now,
            bytes_received: 0,
            step_count: 0,
        }
    }
}

/// One assistant-CLI session: identity, working directory, lifecycle state,
/// and command bookkeeping. Output buffering and the PTY handle live in the
/// session manager so this struct stays cheap to clone for persistence.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub id: SessionId,
    pub name: String,
    pub working_dir: PathBuf,
    pub created_at: u64,
    pub command_count: u64,
    pub status: SessionStatus,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl SessionMeta {
    #[must_use]
    pub fn new(name: String, working_dir: PathBuf, created_at: u64) -> Self {
        SessionMeta {
            id: SessionId::new(),
            name,
            working_dir,
            created_at,
            command_count: 0,
            status: SessionStatus::Idle,
            description: None,
            tags: Vec::new(),
        }
    }
}
