//! Workspace Store (spec component G): persists `{workspace_slot →
//! Workspace}` as JSON with atomic saves and corruption recovery.

pub mod model;
pub mod store;

pub use model::{SessionSnapshot, Workspace, WorkspaceId, WorkspaceMap, WorkspaceSlot, WorkspaceState};
pub use store::WorkspaceStore;
