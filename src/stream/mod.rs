//! Stream Processor (spec component C): turns raw PTY bytes into styled
//! runs for the output log, a live status string, code-block annotations,
//! and throughput metrics.

pub mod ansi_filter;
pub mod code_blocks;
pub mod metrics;
pub mod status_extract;
pub mod styled_text;

use std::time::Instant;

use ansi_filter::AnsiFilter;
use code_blocks::{CodeBlock, CodeBlockDetector};
use metrics::{CommandMetrics, MetricsSnapshot};
use status_extract::{extract_status, StatusHistory};
use styled_text::{StyledRun, StyledTextConverter};

/// Result of feeding one raw chunk through the pipeline.
#[derive(Debug, Default)]
pub struct ProcessedChunk {
    pub runs: Vec<StyledRun>,
    pub new_status: Option<String>,
    pub closed_blocks: Vec<CodeBlock>,
}

/// Owns all per-session streaming state: the ANSI filter, styled-text
/// converter, status history, code-block detector, and current command's
/// metrics. One instance per live session.
#[derive(Debug)]
pub struct StreamProcessor {
    ansi: AnsiFilter,
    styled: StyledTextConverter,
    status: StatusHistory,
    blocks: CodeBlockDetector,
    metrics: Option<CommandMetrics>,
    /// Trailing bytes of the last ANSI-filtered chunk that ended mid
    /// multi-byte UTF-8 sequence, held back until the rest arrives (spec
    /// §4.A: PTY chunks aren't guaranteed to split on character boundaries).
    pending: Vec<u8>,
}

impl Default for StreamProcessor {
    fn default() -> Self {
        StreamProcessor {
            ansi: AnsiFilter::new(),
            styled: StyledTextConverter::new(),
            status: StatusHistory::new(),
            blocks: CodeBlockDetector::new(),
            metrics: None,
            pending: Vec::new(),
        }
    }
}

impl StreamProcessor {
    #[must_use]
    pub fn new() -> Self {
        StreamProcessor::default()
    }

    /// Arm metrics tracking for a freshly submitted command (spec §4.C.5).
    pub fn start_command(&mut self, now: Instant) {
        self.metrics = Some(CommandMetrics::new(now));
        self.status.reset();
    }

    /// Feed one raw PTY chunk through ANSI filtering, styling, status
    /// extraction, and code-block detection, in that order.
    pub fn process(&mut self, raw: &[u8], now: Instant) -> ProcessedChunk {
        if let Some(metrics) = &mut self.metrics {
            metrics.record_bytes(now, raw.len() as u64);
        }

        let mut filtered = self.ansi.filter(raw);
        if !self.pending.is_empty() {
            let mut combined = std::mem::take(&mut self.pending);
            combined.extend_from_slice(&filtered);
            filtered = combined;
        }
        let complete_len = complete_utf8_prefix_len(&filtered);
        self.pending = filtered.split_off(complete_len);

        let runs = self.styled.convert(&filtered);
        let plain = String::from_utf8_lossy(&filtered).into_owned();

        let new_status = extract_status(&plain).and_then(|status| {
            if self.status.record(status.clone()) {
                Some(status)
            } else {
                None
            }
        });

        let closed_blocks = self.blocks.feed(&plain);

        ProcessedChunk {
            runs,
            new_status,
            closed_blocks,
        }
    }

    #[must_use]
    pub fn current_status(&self) -> Option<&str> {
        self.status.current()
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.status.step_count()
    }

    #[must_use]
    pub fn metrics_snapshot(&self, now: Instant) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|m| m.snapshot(now))
    }

    #[must_use]
    pub fn block_at_line(&self, line_offset: usize) -> Option<&CodeBlock> {
        self.blocks.block_at_line(line_offset)
    }
}

/// Length of the longest prefix of `bytes` that doesn't end mid multi-byte
/// UTF-8 sequence. The trailing remainder (if any) should be held back and
/// prepended to the next chunk rather than decoded now.
fn complete_utf8_prefix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let max_back = len.min(4);
    for back in 1..=max_back {
        let idx = len - back;
        let byte = bytes[idx];
        if byte & 0xC0 == 0x80 {
            continue; // continuation byte: keep walking back to find its lead
        }
        let seq_len = if byte & 0x80 == 0 {
            1
        } else if byte & 0xE0 == 0xC0 {
            2
        } else if byte & 0xF0 == 0xE0 {
            3
        } else if byte & 0xF8 == 0xF0 {
            4
        } else {
            1 // not a valid lead byte; let from_utf8_lossy replace it as-is
        };
        return if back < seq_len { idx } else { len };
    }
    len - max_back
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_strips_ansi_and_reports_status() {
        let mut proc = StreamProcessor::new();
        proc.start_command(Instant::now());
        let chunk = proc.process(b"\x1b[?2004hReading \"main.rs\"\n", Instant::now());
        assert_eq!(chunk.new_status.as_deref(), Some("Reading main.rs"));
        let joined: String = chunk.runs.iter().map(|r| r.text.as_str()).collect();
        assert!(!joined.contains("2004"));
    }

    #[test]
    fn process_detects_completed_code_block_across_chunks() {
        let mut proc = StreamProcessor::new();
        proc.start_command(Instant::now());
        let first = proc.process(b"```rust\nfn x() {}\n", Instant::now());
        assert!(first.closed_blocks.is_empty());
        let second = proc.process(b"```\n", Instant::now());
        assert_eq!(second.closed_blocks.len(), 1);
    }

    #[test]
    fn metrics_snapshot_is_none_until_command_started() {
        let proc = StreamProcessor::new();
        assert!(proc.metrics_snapshot(Instant::now()).is_none());
    }

    #[test]
    fn multi_byte_character_split_across_chunks_is_not_corrupted() {
        let mut proc = StreamProcessor::new();
        proc.start_command(Instant::now());
        // "caf\u{e9}" (5 bytes in UTF-8: c a f 0xC3 0xA9) split mid-character.
        let bytes = "café".as_bytes();
        let (first_half, second_half) = bytes.split_at(bytes.len() - 1);

        let first = proc.process(first_half, Instant::now());
        let first_text: String = first.runs.iter().map(|r| r.text.as_str()).collect();
        assert!(!first_text.contains('\u{fffd}'), "no replacement character before the rest arrives");

        let second = proc.process(second_half, Instant::now());
        let second_text: String = second.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(format!("{first_text}{second_text}"), "café");
    }

    #[test]
    fn complete_utf8_prefix_len_holds_back_a_trailing_partial_sequence() {
        let bytes = "café".as_bytes();
        let (first_half, _) = bytes.split_at(bytes.len() - 1);
        // first_half ends in the lead byte of "é"'s 2-byte sequence with its
        // continuation byte not yet present, so only "caf" (3 bytes) is complete.
        assert_eq!(complete_utf8_prefix_len(first_half), first_half.len() - 1);
    }

    #[test]
    fn complete_utf8_prefix_len_is_a_no_op_for_pure_ascii() {
        assert_eq!(complete_utf8_prefix_len(b"hello"), 5);
    }
}
