//! Strips CSI sequences that would fight the host TUI compositor for control
//! of bracketed paste, mouse tracking, cursor visibility, and the alternate
//! screen (spec §4.C.1). Everything else — colors, attributes, in-line
//! erase — passes through untouched for the styled-text converter.

/// The private-mode CSI final byte is always `h` (set) or `l` (reset); the
/// parameter block is one of these `?NNNN` codes.
const STRIPPED_PRIVATE_MODES: &[&str] = &["2004", "2026", "1004", "25", "1049"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Plain,
    Escape,
    Csi,
}

/// Stateful filter: a PTY chunk boundary may land in the middle of an escape
/// sequence, so state (and the partially-consumed sequence) carries across
/// `filter` calls.
#[derive(Debug, Default)]
pub struct AnsiFilter {
    state: ParseStateHolder,
    csi_buf: Vec<u8>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ParseStateHolder(Option<ParseState>);

impl AnsiFilter {
    #[must_use]
    pub fn new() -> Self {
        AnsiFilter::default()
    }

    /// Filter one chunk, returning the bytes to pass downstream. Idempotent:
    /// running the filter twice over its own output is a no-op (spec §8),
    /// since the sequences it strips never survive a first pass.
    pub fn filter(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut state = self.state.0.take().unwrap_or(ParseState::Plain);

        for &byte in input {
            match state {
                ParseState::Plain => {
                    if byte == 0x1b {
                        state = ParseState::Escape;
                        self.csi_buf.clear();
                        self.csi_buf.push(byte);
                    } else {
                        out.push(byte);
                    }
                }
                ParseState::Escape => {
                    self.csi_buf.push(byte);
                    if byte == b'[' {
                        state = ParseState::Csi;
                    } else {
                        // Non-CSI escape (e.g. ESC 7/8): pass through untouched.
                        out.extend_from_slice(&self.csi_buf);
                        state = ParseState::Plain;
                    }
                }
                ParseState::Csi => {
                    self.csi_buf.push(byte);
                    if (0x40..=0x7e).contains(&byte) {
                        if !is_stripped_sequence(&self.csi_buf) {
                            out.extend_from_slice(&self.csi_buf);
                        }
                        state = ParseState::Plain;
                    }
                }
            }
        }

        if state != ParseState::Plain {
            self.state.0 = Some(state);
        }
        out
    }
}

/// `csi_buf` includes the leading `ESC [` and the trailing final byte, e.g.
/// `ESC [ ? 2 0 0 4 h`.
fn is_stripped_sequence(csi_buf: &[u8]) -> bool {
    if csi_buf.len() < 3 || csi_buf[2] != b'?' {
        return false;
    }
    let final_byte = csi_buf[csi_buf.len() - 1];
    if final_byte != b'h' && final_byte != b'l' {
        return false;
    }
    let params = &csi_buf[3..csi_buf.len() - 1];
    let Ok(params) = std::str::from_utf8(params) else {
        return false;
    };
    STRIPPED_PRIVATE_MODES.contains(&params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_plain_text_and_colors() {
        let mut filter = AnsiFilter::new();
        let input = b"\x1b[31mHELLO\x1b[0m";
        assert_eq!(filter.filter(input), input.to_vec());
    }

    #[test]
    fn strips_bracketed_paste_toggle() {
        let mut filter = AnsiFilter::new();
        let input = b"\x1b[?2004h\x1b[31mHELLO\x1b[0m\x1b[?2004l";
        let expected = b"\x1b[31mHELLO\x1b[0m".to_vec();
        assert_eq!(filter.filter(input), expected);
    }

    #[test]
    fn strips_mouse_tracking_and_cursor_visibility_and_altscreen() {
        let mut filter = AnsiFilter::new();
        let input = b"\x1b[?1004h\x1b[?25l\x1b[?1049hOK\x1b[?1049l\x1b[?25h\x1b[?1004l";
        assert_eq!(filter.filter(input), b"OK".to_vec());
    }

    #[test]
    fn handles_sequence_split_across_chunks() {
        let mut filter = AnsiFilter::new();
        let mut out = filter.filter(b"before\x1b[?20");
        out.extend(filter.filter(b"04hafter"));
        assert_eq!(out, b"beforeafter".to_vec());
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut filter = AnsiFilter::new();
        let input = b"\x1b[?2004h\x1b[32mGREEN\x1b[0m\x1b[?25l";
        let once = filter.filter(input);
        let mut filter2 = AnsiFilter::new();
        let twice = filter2.filter(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn unrelated_private_mode_codes_survive() {
        let mut filter = AnsiFilter::new();
        // ?1h (cursor keys mode) is not in the stripped list.
        let input = b"\x1b[?1hOK\x1b[?1l";
        assert_eq!(filter.filter(input), input.to_vec());
    }
}
