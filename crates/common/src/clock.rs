//! Clock and formatting utilities for recording status.
//!
//! A session's elapsed time is anchored to a monotonic epoch captured when
//! the recorder reports that it started. Paused intervals are excluded so
//! the counter suspends without resetting. The `*_at` variants take an
//! explicit instant so callers (and tests) control the sampling point.

use std::time::{Duration, Instant};

/// A recording clock that measures active (non-paused) time since start.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Set while paused.
    paused_at: Option<Instant>,

    /// Sum of all completed pause intervals.
    paused_total: Duration,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    /// Create a clock anchored to a known instant.
    pub fn start_at(epoch: Instant) -> Self {
        Self {
            epoch,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    /// Suspend the clock. Pausing twice keeps the first pause point.
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Resume after a pause. No-op when not paused.
    pub fn resume_at(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    /// Active time elapsed between start and `now`.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.epoch)
            .saturating_sub(self.paused_total)
    }
}

/// Format a duration as `MM:SS`. Minutes keep counting past 59.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format a byte count as mebibytes with one decimal, e.g. `1.0 MB`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = RecordingClock::start();
        assert!(clock.elapsed_at(Instant::now()) < Duration::from_secs(1));
    }

    #[test]
    fn test_pause_excludes_paused_interval() {
        let t0 = Instant::now();
        let mut clock = RecordingClock::start_at(t0);

        clock.pause_at(t0 + Duration::from_secs(3));
        assert_eq!(
            clock.elapsed_at(t0 + Duration::from_secs(10)),
            Duration::from_secs(3)
        );

        clock.resume_at(t0 + Duration::from_secs(10));
        assert_eq!(
            clock.elapsed_at(t0 + Duration::from_secs(12)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_immediate_resume_keeps_elapsed() {
        let t0 = Instant::now();
        let mut clock = RecordingClock::start_at(t0);
        let at = t0 + Duration::from_millis(4_250);

        let before = clock.elapsed_at(at);
        clock.pause_at(at);
        clock.resume_at(at);
        assert_eq!(clock.elapsed_at(at), before);
    }

    #[test]
    fn test_double_pause_keeps_first_point() {
        let t0 = Instant::now();
        let mut clock = RecordingClock::start_at(t0);
        clock.pause_at(t0 + Duration::from_secs(1));
        clock.pause_at(t0 + Duration::from_secs(5));
        assert_eq!(
            clock.elapsed_at(t0 + Duration::from_secs(9)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00");
        assert_eq!(format_elapsed(Duration::from_millis(61_900)), "01:01");
        assert_eq!(format_elapsed(Duration::from_secs(6_000)), "100:00");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(0), "0.0 MB");
        assert_eq!(format_megabytes(1_020_000), "1.0 MB");
        assert_eq!(format_megabytes(5 * 1024 * 1024 + 600 * 1024), "5.6 MB");
    }
}
