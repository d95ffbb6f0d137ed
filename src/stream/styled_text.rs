//! Converts an ANSI byte stream (post-filtering) into `(text, style)` runs.
//! Stateful across chunks: SGR attributes persist until reset, the same way
//! a real terminal's cursor state does (spec §4.C.2).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Named(u8),
    Indexed(u8),
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub style: Style,
}

/// Stateful SGR-aware converter. Feed it filtered bytes; get back styled runs.
#[derive(Debug, Default)]
pub struct StyledTextConverter {
    current: Style,
    partial_escape: Vec<u8>,
    in_escape: bool,
}

impl StyledTextConverter {
    #[must_use]
    pub fn new() -> Self {
        StyledTextConverter::default()
    }

    /// Convert one chunk into styled runs under the running SGR state.
    /// Non-SGR CSI sequences (cursor movement, erase-line) are dropped from
    /// the run text but do not otherwise affect style.
    pub fn convert(&mut self, input: &[u8]) -> Vec<StyledRun> {
        let text = String::from_utf8_lossy(input);
        let mut runs = Vec::new();
        let mut current_text = String::new();
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if self.in_escape {
                self.partial_escape.push(ch as u8);
                if ch.is_ascii_alphabetic() || ('@'..='~').contains(&ch) {
                    self.in_escape = false;
                    self.apply_escape(&self.partial_escape.clone());
                    self.partial_escape.clear();
                }
                continue;
            }

            if ch == '\x1b' {
                if !current_text.is_empty() {
                    runs.push(StyledRun {
                        text: std::mem::take(&mut current_text),
                        style: self.current,
                    });
                }
                self.in_escape = true;
                self.partial_escape.clear();
                self.partial_escape.push(b'\x1b');
                continue;
            }

            current_text.push(ch);
        }

        if !current_text.is_empty() {
            runs.push(StyledRun {
                text: current_text,
                style: self.current,
            });
        }
        runs
    }

    fn apply_escape(&mut self, seq: &[u8]) {
        // seq is ESC '[' ... final; only SGR ('m') sequences affect style.
        if seq.len() < 3 || seq[1] != b'[' || seq[seq.len() - 1] != b'm' {
            return;
        }
        let params = &seq[2..seq.len() - 1];
        let Ok(params) = std::str::from_utf8(params) else {
            return;
        };
        let codes: Vec<i64> = params
            .split(';')
            .map(|p| if p.is_empty() { 0 } else { p.parse().unwrap_or(0) })
            .collect();
        self.apply_sgr_codes(&codes);
    }

    fn apply_sgr_codes(&mut self, codes: &[i64]) {
        let mut i = 0;
        if codes.is_empty() {
            self.current = Style::default();
            return;
        }
        while i < codes.len() {
            match codes[i] {
                0 => self.current = Style::default(),
                1 => self.current.bold = true,
                2 => self.current.dim = true,
                3 => self.current.italic = true,
                4 => self.current.underline = true,
                22 => {
                    self.current.bold = false;
                    self.current.dim = false;
                }
                23 => self.current.italic = false,
                24 => self.current.underline = false,
                30..=37 => self.current.fg = Some(Color::Named((codes[i] - 30) as u8)),
                39 => self.current.fg = None,
                40..=47 => self.current.bg = Some(Color::Named((codes[i] - 40) as u8)),
                49 => self.current.bg = None,
                90..=97 => self.current.fg = Some(Color::Named((codes[i] - 90 + 8) as u8)),
                100..=107 => self.current.bg = Some(Color::Named((codes[i] - 100 + 8) as u8)),
                38 => {
                    i += consume_extended_color(codes, i, true, &mut self.current);
                }
                48 => {
                    i += consume_extended_color(codes, i, false, &mut self.current);
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Consumes a `38;5;N` (256-color) or `38;2;R;G;B` (truecolor) sequence
/// starting at `codes[i]` (which is the `38`/`48` itself). Returns the
/// number of *extra* entries consumed beyond `codes[i]`.
fn consume_extended_color(codes: &[i64], i: usize, is_fg: bool, style: &mut Style) -> usize {
    match codes.get(i + 1) {
        Some(5) => {
            let Some(&idx) = codes.get(i + 2) else {
                return 0;
            };
            let color = Color::Indexed(idx.clamp(0, 255) as u8);
            if is_fg {
                style.fg = Some(color);
            } else {
                style.bg = Some(color);
            }
            2
        }
        Some(2) => {
            let (Some(&r), Some(&g), Some(&b)) =
                (codes.get(i + 2), codes.get(i + 3), codes.get(i + 4))
            else {
                return 0;
            };
            let color = Color::Rgb(
                r.clamp(0, 255) as u8,
                g.clamp(0, 255) as u8,
                b.clamp(0, 255) as u8,
            );
            if is_fg {
                style.fg = Some(color);
            } else {
                style.bg = Some(color);
            }
            4
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_red_bold_run() {
        let mut conv = StyledTextConverter::new();
        let runs = conv.convert(b"\x1b[1;31mHELLO\x1b[0m");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "HELLO");
        assert!(runs[0].style.bold);
        assert_eq!(runs[0].style.fg, Some(Color::Named(1)));
    }

    #[test]
    fn sgr_state_persists_across_convert_calls() {
        let mut conv = StyledTextConverter::new();
        let _ = conv.convert(b"\x1b[32m");
        let runs = conv.convert(b"still green");
        assert_eq!(runs[0].style.fg, Some(Color::Named(2)));
    }

    #[test]
    fn handles_escape_split_across_chunks() {
        let mut conv = StyledTextConverter::new();
        let first = conv.convert(b"\x1b[3");
        assert!(first.is_empty());
        let second = conv.convert(b"1mred");
        assert_eq!(second[0].text, "red");
        assert_eq!(second[0].style.fg, Some(Color::Named(1)));
    }

    #[test]
    fn true_color_foreground() {
        let mut conv = StyledTextConverter::new();
        let runs = conv.convert(b"\x1b[38;2;10;20;30mX");
        assert_eq!(runs[0].style.fg, Some(Color::Rgb(10, 20, 30)));
    }

    #[test]
    fn indexed_256_color_background() {
        let mut conv = StyledTextConverter::new();
        let runs = conv.convert(b"\x1b[48;5;200mX");
        assert_eq!(runs[0].style.bg, Some(Color::Indexed(200)));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let input: &[u8] = b"\x1b[1;33;44mwarn\x1b[0m plain";
        let mut a = StyledTextConverter::new();
        let mut b = StyledTextConverter::new();
        assert_eq!(a.convert(input), b.convert(input));
    }
}
