//! On-disk JSON schema for workspaces (spec §3, §6).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque workspace identifier, stable across saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(Uuid);

impl WorkspaceId {
    #[must_use]
    pub fn new() -> Self {
        WorkspaceId(Uuid::new_v4())
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// A persisted session: enough to restore its card in the UI and to
/// re-derive its working directory, but not the live PTY (that respawns on
/// demand from `working_dir`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub name: String,
    pub working_dir: String,
    pub created_at: u64,
    pub command_count: u64,
    /// Tail of the session's styled output, capped to `SNAPSHOT_TAIL_LINES`.
    pub output_snapshot: Vec<String>,
    pub status_hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub created_at: u64,
    pub modified_at: u64,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub sessions: Vec<SessionSnapshot>,
}

impl Workspace {
    #[must_use]
    pub fn new(name: String, created_at: u64) -> Self {
        Workspace {
            workspace_id: WorkspaceId::new(),
            name,
            created_at,
            modified_at: created_at,
            description: None,
            tags: Vec::new(),
            sessions: Vec::new(),
        }
    }

    /// Cap each session's output snapshot to `max_tail_lines` (spec §4.G).
    pub fn truncate_snapshots(&mut self, max_tail_lines: usize) {
        for session in &mut self.sessions {
            if session.output_snapshot.len() > max_tail_lines {
                let drop = session.output_snapshot.len() - max_tail_lines;
                session.output_snapshot.drain(0..drop);
            }
        }
    }
}

/// All saved workspaces, keyed by slot (spec §6: `{workspace_slot →
/// Workspace}`). A `BTreeMap` keeps serialized output byte-for-byte stable
/// across saves with identical content, which the atomic round-trip
/// property (spec §8) depends on.
pub type WorkspaceSlot = u32;
pub type WorkspaceMap = std::collections::BTreeMap<WorkspaceSlot, Workspace>;

/// `workspace_state.json`: the active slot pointer plus the last pane
/// arrangement, so a relaunch restores where the user left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    pub active_slot: WorkspaceSlot,
    /// Session ids in arena order, for rebuilding the pane layout.
    pub pane_order: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_snapshots_keeps_only_the_tail() {
        let mut ws = Workspace::new("w".into(), 0);
        ws.sessions.push(SessionSnapshot {
            session_id: "s1".into(),
            name: "alpha".into(),
            working_dir: "/tmp".into(),
            created_at: 0,
            command_count: 1,
            output_snapshot: (0..100).map(|i| i.to_string()).collect(),
            status_hint: "idle".into(),
        });
        ws.truncate_snapshots(50);
        assert_eq!(ws.sessions[0].output_snapshot.len(), 50);
        assert_eq!(ws.sessions[0].output_snapshot[0], "50");
    }
}
