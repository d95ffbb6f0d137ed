//! Session Pane Controller (spec component E): input submission, history
//! navigation, and slash-command autocomplete for one session.

use super::history::CommandHistory;

/// Slash commands recognized anywhere a command can be typed (spec §6 plus
/// the workspace-metadata commands added in this crate's expanded spec).
pub const SLASH_COMMANDS: &[&str] = &[
    "/search", "/export", "/model", "/rename", "/describe", "/tag",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLineMode {
    Single,
    Multi,
}

#[derive(Debug)]
pub struct PaneController {
    pub input: String,
    pub line_mode: InputLineMode,
    pub history: CommandHistory,
    autocomplete_index: Option<usize>,
}

/// What happened as a result of a keystroke the pane controller handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Submit(String),
    None,
}

impl Default for PaneController {
    fn default() -> Self {
        PaneController {
            input: String::new(),
            line_mode: InputLineMode::Single,
            history: CommandHistory::default(),
            autocomplete_index: None,
        }
    }
}

impl PaneController {
    #[must_use]
    pub fn new() -> Self {
        PaneController::default()
    }

    /// Like [`PaneController::new`], but with the command-history capacity
    /// (spec §9 `HISTORY_DEPTH`) set explicitly instead of the default 100.
    #[must_use]
    pub fn with_history_capacity(capacity: usize) -> Self {
        PaneController {
            history: CommandHistory::new(capacity),
            ..PaneController::default()
        }
    }

    /// Enter combined with the current line mode: submits in single-line
    /// mode, or inserts a newline in multi-line mode.
    pub fn on_enter(&mut self) -> InputAction {
        match self.line_mode {
            InputLineMode::Single => self.submit(),
            InputLineMode::Multi => {
                self.input.push('\n');
                InputAction::None
            }
        }
    }

    /// Shift+Enter: switch to multi-line mode without submitting. Doesn't
    /// itself insert a newline — that happens when `Enter` is next pressed
    /// while already in `Multi` mode, so typed text doesn't get a spurious
    /// leading line break.
    pub fn on_shift_enter(&mut self) {
        self.line_mode = InputLineMode::Multi;
    }

    /// Ctrl+Enter: submit even while in multi-line mode.
    pub fn on_ctrl_enter(&mut self) -> InputAction {
        self.submit()
    }

    /// Escape: exit multi-line mode back to single-line, or dismiss the
    /// autocomplete dropdown if one is open.
    pub fn on_escape(&mut self) {
        if self.autocomplete_index.is_some() {
            self.autocomplete_index = None;
            return;
        }
        self.line_mode = InputLineMode::Single;
    }

    fn submit(&mut self) -> InputAction {
        if self.input.trim().is_empty() {
            return InputAction::None;
        }
        let command = std::mem::take(&mut self.input);
        self.history.push(command.clone());
        self.line_mode = InputLineMode::Single;
        self.autocomplete_index = None;
        InputAction::Submit(command)
    }

    pub fn navigate_history_up(&mut self) {
        if let Some(entry) = self.history.navigate_up(&self.input) {
            self.input = entry.to_string();
        }
    }

    pub fn navigate_history_down(&mut self) {
        if let Some(entry) = self.history.navigate_down() {
            self.input = entry.to_string();
        }
    }

    /// Slash commands whose name starts with the current input (only
    /// meaningful once `input` starts with `/`).
    #[must_use]
    pub fn autocomplete_candidates(&self) -> Vec<&'static str> {
        if !self.input.starts_with('/') {
            return Vec::new();
        }
        SLASH_COMMANDS
            .iter()
            .copied()
            .filter(|cmd| cmd.starts_with(self.input.as_str()))
            .collect()
    }

    #[must_use]
    pub fn autocomplete_open(&self) -> bool {
        !self.autocomplete_candidates().is_empty() && self.input.starts_with('/')
    }

    /// Arrow keys navigate the dropdown while it's open, rather than history.
    pub fn autocomplete_move(&mut self, delta: isize) {
        let candidates = self.autocomplete_candidates();
        if candidates.is_empty() {
            self.autocomplete_index = None;
            return;
        }
        let len = candidates.len() as isize;
        let current = self.autocomplete_index.map_or(0, |i| i as isize);
        let next = (current + delta).rem_euclid(len);
        self.autocomplete_index = Some(next as usize);
    }

    /// Tab/Enter to accept the highlighted (or first) autocomplete candidate.
    pub fn autocomplete_accept(&mut self) {
        let candidates = self.autocomplete_candidates();
        if let Some(choice) = candidates.get(self.autocomplete_index.unwrap_or(0)) {
            self.input = (*choice).to_string();
            self.input.push(' ');
        }
        self.autocomplete_index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_submits_in_single_line_mode() {
        let mut pane = PaneController::new();
        pane.input = "hi".to_string();
        assert_eq!(pane.on_enter(), InputAction::Submit("hi".to_string()));
        assert!(pane.input.is_empty());
    }

    #[test]
    fn shift_enter_then_ctrl_enter_submits_multiline() {
        // Shift-Enter, type "line1", Enter, type "line2", Ctrl-Enter.
        let mut pane = PaneController::new();
        pane.on_shift_enter();
        pane.input.push_str("line1");
        assert_eq!(pane.on_enter(), InputAction::None);
        pane.input.push_str("line2");
        assert_eq!(pane.line_mode, InputLineMode::Multi);
        assert_eq!(
            pane.on_ctrl_enter(),
            InputAction::Submit("line1\nline2".to_string())
        );
    }

    #[test]
    fn empty_submission_is_a_noop() {
        let mut pane = PaneController::new();
        pane.input = "   ".to_string();
        assert_eq!(pane.on_enter(), InputAction::None);
        assert_eq!(pane.history.len(), 0);
    }

    #[test]
    fn escape_exits_multiline_mode() {
        let mut pane = PaneController::new();
        pane.on_shift_enter();
        pane.on_escape();
        assert_eq!(pane.line_mode, InputLineMode::Single);
    }

    #[test]
    fn autocomplete_filters_by_prefix() {
        let mut pane = PaneController::new();
        pane.input = "/ex".to_string();
        assert_eq!(pane.autocomplete_candidates(), vec!["/export"]);
        assert!(pane.autocomplete_open());
    }

    #[test]
    fn autocomplete_accept_fills_input() {
        let mut pane = PaneController::new();
        pane.input = "/mod".to_string();
        pane.autocomplete_accept();
        assert_eq!(pane.input, "/model ");
    }
}
