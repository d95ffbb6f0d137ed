//! Real-time status-string extraction from assistant-CLI output (spec
//! §4.C.3): a fixed priority table of regexes, the first match per chunk
//! wins, and a bounded history of distinct statuses feeds the step count.

use std::collections::VecDeque;

use regex::Regex;
use std::sync::OnceLock;

const MAX_STATUS_HISTORY: usize = 10;
const MAX_SEARCH_QUERY_CHARS: usize = 40;
const MAX_SHORT_PHRASE_CHARS: usize = 40;

struct PatternEntry {
    regex: &'static Lazy,
    render: fn(&regex::Captures) -> String,
}

/// Thin stand-in for `once_cell::Lazy` using the stdlib `OnceLock`, matching
/// how `prompt/regex.rs` compiles patterns once and reuses them.
struct Lazy {
    pattern: &'static str,
    cell: OnceLock<Regex>,
}

impl Lazy {
    const fn new(pattern: &'static str) -> Self {
        Lazy {
            pattern,
            cell: OnceLock::new(),
        }
    }

    fn get(&self) -> &Regex {
        self.cell
            .get_or_init(|| Regex::new(self.pattern).expect("status pattern must compile"))
    }
}

static PAT_INVOKE: Lazy = Lazy::new(r#"(?i)<invoke\s+name=["']?([\w.\-/]+)"#);
static PAT_READING: Lazy = Lazy::new(r#"(?i)\bReading\s+["']?([^\s"']+)"#);
static PAT_WRITING: Lazy = Lazy::new(r#"(?i)\bWriting\s+["']?([^\s"']+)"#);
static PAT_EDITING: Lazy = Lazy::new(r#"(?i)\bEditing\s+["']?([^\s"']+)"#);
static PAT_SEARCHING: Lazy = Lazy::new(r#"(?i)\bSearch(?:ing)?\s+for\s+["']?([^"'\n]+)"#);
static PAT_RUNNING: Lazy = Lazy::new(r#"(?i)\bRunning\s+["']?([^"'\n]+)"#);
static PAT_ANALYZING: Lazy =
    Lazy::new(r#"(?i)\b((?:Analyz|Check|Verif)ing)\s+["']?([^"'\n]+)"#);
static PAT_BUILDING: Lazy =
    Lazy::new(r#"(?i)\b((?:Install|Build|Compil)ing)\s+["']?([^"'\n]+)"#);
static PAT_SHORT_PHRASE: Lazy = Lazy::new(r"(?m)^([A-Z][\w \-']{2,38}\.{3}|[A-Z][\w \-']{2,38})$");
static PAT_GENERIC_GERUND: Lazy = Lazy::new(r"(?i)\b([A-Z][a-z]+ing)\b");

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max).collect();
        format!("{truncated}...")
    }
}

fn render_invoke(caps: &regex::Captures) -> String {
    format!("Using {}", &caps[1])
}
fn render_reading(caps: &regex::Captures) -> String {
    format!("Reading {}", basename(&caps[1]))
}
fn render_writing(caps: &regex::Captures) -> String {
    format!("Writing {}", basename(&caps[1]))
}
fn render_editing(caps: &regex::Captures) -> String {
    format!("Editing {}", basename(&caps[1]))
}
fn render_searching(caps: &regex::Captures) -> String {
    format!("Searching: {}", truncate_chars(caps[1].trim(), MAX_SEARCH_QUERY_CHARS))
}
fn render_running(caps: &regex::Captures) -> String {
    format!("Running: {}", caps[1].trim())
}
fn render_analyzing(caps: &regex::Captures) -> String {
    format!("{}: {}", &caps[1], caps[2].trim())
}
fn render_building(caps: &regex::Captures) -> String {
    format!("{}: {}", &caps[1], caps[2].trim())
}
fn render_short_phrase(caps: &regex::Captures) -> String {
    truncate_chars(caps[1].trim(), MAX_SHORT_PHRASE_CHARS)
}
fn render_generic_gerund(caps: &regex::Captures) -> String {
    caps[1].to_string()
}

static PATTERNS: &[PatternEntry] = &[
    PatternEntry { regex: &PAT_INVOKE, render: render_invoke },
    PatternEntry { regex: &PAT_READING, render: render_reading },
    PatternEntry { regex: &PAT_WRITING, render: render_writing },
    PatternEntry { regex: &PAT_EDITING, render: render_editing },
    PatternEntry { regex: &PAT_SEARCHING, render: render_searching },
    PatternEntry { regex: &PAT_RUNNING, render: render_running },
    PatternEntry { regex: &PAT_ANALYZING, render: render_analyzing },
    PatternEntry { regex: &PAT_BUILDING, render: render_building },
    PatternEntry { regex: &PAT_SHORT_PHRASE, render: render_short_phrase },
    PatternEntry { regex: &PAT_GENERIC_GERUND, render: render_generic_gerund },
];

/// Find the highest-priority status match in `text`, or `None`.
#[must_use]
pub fn extract_status(text: &str) -> Option<String> {
    for entry in PATTERNS {
        if let Some(caps) = entry.regex.get().captures(text) {
            return Some((entry.render)(&caps));
        }
    }
    None
}

/// Bounded history of the most recent distinct status strings for one
/// command cycle; also doubles as the step counter.
#[derive(Debug, Default)]
pub struct StatusHistory {
    recent: VecDeque<String>,
}

impl StatusHistory {
    #[must_use]
    pub fn new() -> Self {
        StatusHistory::default()
    }

    /// Record a status if it differs from the most recent one. Returns
    /// `true` if it was actually recorded (i.e. a new distinct status).
    pub fn record(&mut self, status: String) -> bool {
        if self.recent.back() == Some(&status) {
            return false;
        }
        self.recent.push_back(status);
        if self.recent.len() > MAX_STATUS_HISTORY {
            self.recent.pop_front();
        }
        true
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.recent.back().map(String::as_str)
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.recent.len()
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}
