//! Append-only styled-line log with overwrite (carriage-return), bounded
//! FIFO eviction, search, selection, and tail-follow scroll state (spec
//! §4.D).

use std::collections::VecDeque;

use crate::stream::styled_text::Style;

#[derive(Debug, Clone)]
struct Line {
    cells: Vec<(char, Style)>,
}

impl Line {
    fn new() -> Self {
        Line { cells: Vec::new() }
    }

    fn text(&self) -> String {
        self.cells.iter().map(|(ch, _)| *ch).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: LineCol,
    pub end: LineCol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub y: usize,
    pub following_tail: bool,
}

/// Append-only log. `max_lines` bounds memory; `first_line_index` tracks
/// how many lines have been evicted so external line numbers (used by
/// selections/matches callers hold onto) stay meaningful as a monotonic count.
#[derive(Debug)]
pub struct OutputLog {
    lines: VecDeque<Line>,
    max_lines: usize,
    write_cursor: usize,
    selection: Option<Selection>,
    scroll: ScrollState,
}

impl OutputLog {
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        let mut lines = VecDeque::new();
        lines.push_back(Line::new());
        OutputLog {
            lines,
            max_lines: max_lines.max(1),
            write_cursor: 0,
            selection: None,
            scroll: ScrollState {
                y: 0,
                following_tail: true,
            },
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn line_text(&self, index: usize) -> Option<String> {
        self.lines.get(index).map(Line::text)
    }

    /// Append one logical write: a sequence of styled runs, possibly
    /// containing embedded `\n` (new line) and `\r` (move write cursor to
    /// start of current line; subsequent chars overwrite in place).
    pub fn append(&mut self, runs: &[crate::stream::styled_text::StyledRun]) {
        for run in runs {
            for ch in run.text.chars() {
                match ch {
                    '\n' => {
                        self.lines.push_back(Line::new());
                        self.write_cursor = 0;
                        self.evict_if_over_capacity();
                    }
                    '\r' => {
                        self.write_cursor = 0;
                    }
                    _ => {
                        let line = self.lines.back_mut().expect("at least one line always present");
                        if self.write_cursor < line.cells.len() {
                            line.cells[self.write_cursor] = (ch, run.style);
                        } else {
                            line.cells.push((ch, run.style));
                        }
                        self.write_cursor += 1;
                    }
                }
            }
        }
        if self.scroll.following_tail {
            self.scroll.y = self.lines.len().saturating_sub(1);
        }
    }

    fn evict_if_over_capacity(&mut self) {
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
            if self.scroll.y > 0 {
                self.scroll.y -= 1;
            }
        }
    }

    /// Scan every line for `query`; returns matches in line/column order.
    #[must_use]
    pub fn find_matches(&self, query: &str, case_sensitive: bool) -> Vec<Match> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };
        let mut matches = Vec::new();
        for (line_idx, line) in self.lines.iter().enumerate() {
            let text = line.text();
            let haystack = if case_sensitive {
                text.clone()
            } else {
                text.to_lowercase()
            };
            let chars: Vec<char> = text.chars().collect();
            let needle_len = needle.chars().count();
            if needle_len == 0 || chars.len() < needle_len {
                continue;
            }
            let haystack_chars: Vec<char> = haystack.chars().collect();
            let needle_chars: Vec<char> = needle.chars().collect();
            for start in 0..=haystack_chars.len().saturating_sub(needle_len) {
                if haystack_chars[start..start + needle_len] == needle_chars[..] {
                    matches.push(Match {
                        line: line_idx,
                        col_start: start,
                        col_end: start + needle_len,
                    });
                }
            }
        }
        matches
    }

    #[must_use]
    pub fn selection_get(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selection_set(&mut self, start: LineCol, end: LineCol) {
        self.selection = Some(Selection { start, end });
    }

    pub fn selection_clear(&mut self) {
        self.selection = None;
    }

    #[must_use]
    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    /// User-initiated scroll: disengages tail-follow.
    pub fn scroll_to(&mut self, y: usize) {
        self.scroll.y = y.min(self.lines.len().saturating_sub(1));
        self.scroll.following_tail = false;
    }

    /// Explicit "jump to bottom": re-engages tail-follow.
    pub fn jump_to_bottom(&mut self) {
        self.scroll.y = self.lines.len().saturating_sub(1);
        self.scroll.following_tail = true;
    }
}
