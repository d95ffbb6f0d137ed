//! App-wide modal input state machine (spec §4.I): a single reactive value
//! that determines how keystrokes are routed.

/// One-shot action bindings available from `Command` mode; the concrete
/// key-to-action table lives in the binary's event loop, which is the only
/// place that knows about terminal key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Default mode: pane-switch, quit, window operations.
    Normal,
    /// Keystrokes go to the active session's input box.
    Insert,
    /// Arrow keys/vim-motions move a cursor over output; `y` yanks selection.
    Copy,
    /// Next key is a one-shot action binding, then returns to `Normal`.
    Command,
}

impl Mode {
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Mode::Normal => "i insert  v copy  ^b command  q quit",
            Mode::Insert => "Esc normal  Enter submit",
            Mode::Copy => "hjkl/arrows move  y yank  Esc normal",
            Mode::Command => "next key: action  Esc cancel",
        }
    }
}

/// Tracks the single app-wide mode and applies the entry/exit table from
/// spec §4.I. The binary's event loop calls `on_key` with a coarse
/// classification of the pressed key; it owns the raw terminal key decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    mode: Mode,
}

/// Coarse key classification the mode machine reacts to, independent of the
/// terminal backend's key event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    Escape,
    EnterInsert,
    EnterCopy,
    CommandPrefix,
    Other,
}

impl ModeState {
    #[must_use]
    pub fn new() -> Self {
        ModeState { mode: Mode::Normal }
    }

    #[must_use]
    pub fn current(&self) -> Mode {
        self.mode
    }

    /// Apply one key's effect on the mode, per the entry/exit table. Returns
    /// `true` if the mode changed.
    pub fn on_key(&mut self, intent: KeyIntent) -> bool {
        let next = match (self.mode, intent) {
            (_, KeyIntent::Escape) => Mode::Normal,
            (Mode::Normal, KeyIntent::EnterInsert) => Mode::Insert,
            (Mode::Normal, KeyIntent::EnterCopy) => Mode::Copy,
            (Mode::Normal, KeyIntent::CommandPrefix) => Mode::Command,
            // Command mode consumes exactly one more key, action or not,
            // and always falls back to Normal afterward.
            (Mode::Command, _) => Mode::Normal,
            (current, _) => current,
        };
        let changed = next != self.mode;
        self.mode = next;
        changed
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new()
    }
}
