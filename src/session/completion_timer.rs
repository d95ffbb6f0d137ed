//! Completion-inactivity timer (spec §4.B, §5): fires once output has been
//! quiet for `T` after being armed, driven by the UI event loop's tick
//! rather than a real OS timer (spec §9 — scheduler timers, not coroutines).

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CompletionTimer {
    threshold: Duration,
    last_reset: Option<Instant>,
}

impl CompletionTimer {
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        CompletionTimer {
            threshold,
            last_reset: None,
        }
    }

    /// Arm (or re-arm) the timer; called on submit and on every output chunk.
    pub fn arm(&mut self, now: Instant) {
        self.last_reset = Some(now);
    }

    /// Cancel an armed timer (session closed, or completion already fired).
    pub fn disarm(&mut self) {
        self.last_reset = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.last_reset.is_some()
    }

    /// True once `threshold` has elapsed since the last arm/reset without a
    /// subsequent disarm. Callers should `disarm()` immediately after acting
    /// on a fire so it doesn't fire repeatedly.
    #[must_use]
    pub fn has_fired(&self, now: Instant) -> bool {
        match self.last_reset {
            Some(last) => now.duration_since(last) >= self.threshold,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_timer_never_fires() {
        let timer = CompletionTimer::new(Duration::from_millis(10));
        assert!(!timer.has_fired(Instant::now()));
    }

    #[test]
    fn armed_timer_fires_after_threshold() {
        let mut timer = CompletionTimer::new(Duration::from_millis(5));
        let t0 = Instant::now();
        timer.arm(t0);
        assert!(!timer.has_fired(t0));
        assert!(timer.has_fired(t0 + Duration::from_millis(6)));
    }

    #[test]
    fn re_arming_resets_the_window() {
        let mut timer = CompletionTimer::new(Duration::from_millis(10));
        let t0 = Instant::now();
        timer.arm(t0);
        timer.arm(t0 + Duration::from_millis(9));
        assert!(!timer.has_fired(t0 + Duration::from_millis(15)));
        assert!(timer.has_fired(t0 + Duration::from_millis(20)));
    }

    #[test]
    fn disarm_clears_armed_state() {
        let mut timer = CompletionTimer::new(Duration::from_millis(1));
        timer.arm(Instant::now());
        timer.disarm();
        assert!(!timer.is_armed());
    }
}
