//! Output Pane Model (spec component D): append-only log of styled lines.

pub mod log;

pub use log::{Match, OutputLog, ScrollState, Selection};
