//! Session Manager (spec component B): owns every live PTY session, drives
//! each one's idle/processing/responding/completed state machine, and feeds
//! raw PTY output through the stream processor into its output log.

pub mod completion_timer;
pub mod manager;
pub mod model;

pub use completion_timer::CompletionTimer;
pub use manager::{SessionHandle, SessionManager, TickEvent};
pub use model::{ActiveCommand, SessionId, SessionMeta, SessionStatus};
