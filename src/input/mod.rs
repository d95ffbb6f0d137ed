//! Modal Input (spec component I): the app-wide NORMAL/INSERT/COPY/COMMAND
//! mode machine that determines how keystrokes are routed.

pub mod mode;

pub use mode::{KeyIntent, Mode, ModeState};
