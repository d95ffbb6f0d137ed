//! PTY Handler (spec component A): spawns assistant CLIs under a real
//! pseudo-terminal so they behave like an interactive shell, and forwards
//! raw output to the stream processor.

mod pty;
mod reader;
mod session_guard;

pub use pty::PtySession;
