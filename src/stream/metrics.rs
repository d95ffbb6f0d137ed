//! Per-command throughput metrics (spec §4.C.5): elapsed time, bytes,
//! a crude token estimate, and a sliding-window tokens/sec rate.
//!
//! Token estimation is `bytes / 4`, called out in spec §9 as a crude proxy;
//! callers needing accuracy must plug in a real tokenizer themselves.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const THROUGHPUT_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub elapsed: Duration,
    pub bytes_received: u64,
    pub token_estimate: u64,
    pub tokens_per_sec: u64,
}

#[derive(Debug)]
pub struct CommandMetrics {
    started_at: Instant,
    bytes_received: u64,
    /// (timestamp, bytes-in-this-sample) pairs within the sliding window.
    window: VecDeque<(Instant, u64)>,
}

impl CommandMetrics {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        CommandMetrics {
            started_at: now,
            bytes_received: 0,
            window: VecDeque::new(),
        }
    }

    pub fn record_bytes(&mut self, now: Instant, n: u64) {
        self.bytes_received += n;
        self.window.push_back((now, n));
        while let Some(&(ts, _)) = self.window.front() {
            if now.duration_since(ts) > THROUGHPUT_WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self, now: Instant) -> MetricsSnapshot {
        let window_bytes: u64 = self.window.iter().map(|(_, n)| n).sum();
        let window_secs = THROUGHPUT_WINDOW.as_secs_f64().max(0.001);
        let tokens_per_sec = ((window_bytes as f64 / 4.0) / window_secs) as u64;
        MetricsSnapshot {
            elapsed: now.duration_since(self.started_at),
            bytes_received: self.bytes_received,
            token_estimate: self.bytes_received / 4,
            tokens_per_sec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_is_bytes_over_four() {
        let mut metrics = CommandMetrics::new(Instant::now());
        let t = Instant::now();
        metrics.record_bytes(t, 400);
        assert_eq!(metrics.snapshot(t).token_estimate, 100);
    }

    #[test]
    fn throughput_window_drops_old_samples() {
        let t0 = Instant::now();
        let mut metrics = CommandMetrics::new(t0);
        metrics.record_bytes(t0, 4000);
        let later = t0 + Duration::from_secs(3);
        metrics.record_bytes(later, 0);
        let snap = metrics.snapshot(later);
        assert_eq!(snap.tokens_per_sec, 0);
        assert_eq!(snap.bytes_received, 4000);
    }

    #[test]
    fn elapsed_tracks_since_construction() {
        let t0 = Instant::now();
        let metrics = CommandMetrics::new(t0);
        let snap = metrics.snapshot(t0 + Duration::from_secs(5));
        assert_eq!(snap.elapsed, Duration::from_secs(5));
    }
}
