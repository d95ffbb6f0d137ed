//! Fenced code-block detection across a streaming line buffer (spec §4.C.4).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub content: String,
    pub starting_line: usize,
    pub char_count: usize,
}

#[derive(Debug, Default)]
enum FenceState {
    #[default]
    Outside,
    Inside {
        language: Option<String>,
        starting_line: usize,
        lines: Vec<String>,
    },
}

/// Stateful fence scanner: tracks an open fence across chunk boundaries and
/// a per-session table of completed blocks, indexed by the line the closing
/// fence landed on (so a later lookup-by-hit-line can find it).
#[derive(Debug, Default)]
pub struct CodeBlockDetector {
    state: FenceState,
    line_no: usize,
    pending_line: String,
    blocks: Vec<CodeBlock>,
}

impl CodeBlockDetector {
    #[must_use]
    pub fn new() -> Self {
        CodeBlockDetector::default()
    }

    /// Feed newly appended text (already ANSI-filtered, plain content only).
    /// Returns any code blocks that closed as a result of this call.
    pub fn feed(&mut self, text: &str) -> Vec<CodeBlock> {
        let mut closed = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                self.consume_line(std::mem::take(&mut self.pending_line), &mut closed);
                self.line_no += 1;
            } else {
                self.pending_line.push(ch);
            }
        }
        closed
    }

    fn consume_line(&mut self, line: String, closed: &mut Vec<CodeBlock>) {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            match std::mem::take(&mut self.state) {
                FenceState::Outside => {
                    let language = rest.trim();
                    self.state = FenceState::Inside {
                        language: if language.is_empty() {
                            None
                        } else {
                            Some(language.to_string())
                        },
                        starting_line: self.line_no,
                        lines: Vec::new(),
                    };
                }
                FenceState::Inside {
                    language,
                    starting_line,
                    lines,
                } => {
                    let content = lines.join("\n");
                    let block = CodeBlock {
                        char_count: content.chars().count(),
                        language,
                        content,
                        starting_line,
                    };
                    self.blocks.push(block.clone());
                    closed.push(block);
                    self.state = FenceState::Outside;
                }
            }
            return;
        }

        if let FenceState::Inside { lines, .. } = &mut self.state {
            lines.push(line);
        }
    }

    /// Find a completed block whose body contains `line_offset` (0-based,
    /// relative to `starting_line`), for a right-click copy/save action.
    #[must_use]
    pub fn block_at_line(&self, line_offset: usize) -> Option<&CodeBlock> {
        self.blocks.iter().find(|b| {
            let span = b.content.matches('\n').count() + 1;
            line_offset >= b.starting_line && line_offset < b.starting_line + span
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_simple_fenced_block() {
        let mut det = CodeBlockDetector::new();
        let closed = det.feed("before\n```rust\nfn main() {}\n```\nafter\n");
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].language.as_deref(), Some("rust"));
        assert_eq!(closed[0].content, "fn main() {}");
    }

    #[test]
    fn handles_fence_split_across_feed_calls() {
        let mut det = CodeBlockDetector::new();
        assert!(det.feed("```py\nprint(1)\n").is_empty());
        let closed = det.feed("print(2)\n```\n");
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].content, "print(1)\nprint(2)");
    }

    #[test]
    fn no_language_is_none() {
        let mut det = CodeBlockDetector::new();
        let closed = det.feed("```\nraw\n```\n");
        assert_eq!(closed[0].language, None);
    }

    #[test]
    fn unclosed_fence_produces_no_block_yet() {
        let mut det = CodeBlockDetector::new();
        let closed = det.feed("```js\nconsole.log(1)\n");
        assert!(closed.is_empty());
    }

    #[test]
    fn block_at_line_finds_completed_block() {
        let mut det = CodeBlockDetector::new();
        det.feed("```\nline one\nline two\n```\n");
        assert!(det.block_at_line(1).is_some());
        assert!(det.block_at_line(99).is_none());
    }
}
