//! `StreamProcessor` feeding directly into `OutputLog`, the way
//! `SessionManager::tick` wires them together: ANSI-filtered, styled runs
//! land in the log, carriage returns overwrite in place, and status lines
//! are recognized across the same multi-chunk stream.

use std::time::Instant;

use multiterm::output::OutputLog;
use multiterm::stream::StreamProcessor;

#[test]
fn chunked_progress_output_overwrites_in_place_through_the_full_pipeline() {
    let mut processor = StreamProcessor::new();
    let mut log = OutputLog::new(1000);
    processor.start_command(Instant::now());

    for chunk in [
        &b"\x1b[?2004hDownloading crate"[..],
        b"\rDownloading crate.",
        b"\rDownloading crate..",
        b"\rDownloading crate: done\n",
    ] {
        let processed = processor.process(chunk, Instant::now());
        log.append(&processed.runs);
    }

    assert_eq!(log.line_text(0).as_deref(), Some("Downloading crate: done"));
    assert_eq!(log.line_count(), 2);
}

#[test]
fn status_extraction_and_code_block_detection_both_see_the_same_stream() {
    let mut processor = StreamProcessor::new();
    let mut log = OutputLog::new(1000);
    processor.start_command(Instant::now());

    let first = processor.process(b"Reading \"lib.rs\"\n```rust\n", Instant::now());
    log.append(&first.runs);
    assert_eq!(first.new_status.as_deref(), Some("Reading lib.rs"));
    assert!(first.closed_blocks.is_empty());

    let second = processor.process(b"fn main() {}\n```\n", Instant::now());
    log.append(&second.runs);
    assert_eq!(second.closed_blocks.len(), 1);

    let rendered: String = (0..log.line_count())
        .filter_map(|i| log.line_text(i))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(rendered.contains("fn main"));
    assert!(!rendered.contains("2004"));
}
