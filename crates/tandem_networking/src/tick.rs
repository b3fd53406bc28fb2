//! # Frame Clock
//!
//! Paces [`EngineEvent::Tick`](crate::EngineEvent::Tick) production and
//! keeps timing statistics.
//!
//! The engine measures real elapsed time itself, so the clock only decides
//! when a frame is due. Late frames are not replayed: a stall produces one
//! frame with a clamped step, never a burst.

use std::time::{Duration, Instant};

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
    /// Shortest frame observed, in microseconds.
    pub min_frame_us: u64,
    /// Longest frame observed, in microseconds.
    pub max_frame_us: u64,
    /// Rolling average frame cost, in microseconds.
    pub avg_frame_us: u64,
    /// Frames that took longer than the budget.
    pub late_frames: u64,
    /// Frames measured.
    pub total_frames: u64,
}

impl FrameStats {
    fn empty(budget: Duration) -> Self {
        Self {
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            avg_frame_us: micros(budget),
            late_frames: 0,
            total_frames: 0,
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Fixed-rate frame pacing.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_duration: Duration,
    last_frame: Option<Instant>,
    frame_count: u64,
    stats: FrameStats,
}

impl FrameClock {
    /// Creates a clock running at `rate_hz` frames per second.
    #[must_use]
    pub fn new(rate_hz: u32) -> Self {
        let frame_duration = Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)));
        Self {
            frame_duration,
            last_frame: None,
            frame_count: 0,
            stats: FrameStats::empty(frame_duration),
        }
    }

    /// A 60 Hz display clock.
    #[must_use]
    pub fn display() -> Self {
        Self::new(60)
    }

    /// Returns true if a frame is due at `now`.
    #[must_use]
    pub fn should_tick(&self, now: Instant) -> bool {
        self.last_frame
            .map_or(true, |last| now.saturating_duration_since(last) >= self.frame_duration)
    }

    /// Marks the start of a frame at `now`.
    pub fn begin_frame(&mut self, now: Instant) -> Instant {
        self.last_frame = Some(now);
        self.frame_count += 1;
        now
    }

    /// Records how long the frame that began at `start` took, measured at
    /// `end`.
    pub fn end_frame(&mut self, start: Instant, end: Instant) {
        let cost = end.saturating_duration_since(start);
        let cost_us = micros(cost);

        self.stats.total_frames += 1;
        self.stats.min_frame_us = self.stats.min_frame_us.min(cost_us);
        self.stats.max_frame_us = self.stats.max_frame_us.max(cost_us);
        self.stats.avg_frame_us = (self.stats.avg_frame_us * 15 + cost_us) / 16;

        if cost > self.frame_duration {
            self.stats.late_frames += 1;
        }
    }

    /// Frames begun so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Target frame interval.
    #[must_use]
    pub const fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = FrameStats::empty(self.frame_duration);
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_creation() {
        let clock = FrameClock::new(60);
        assert_eq!(clock.frame_count(), 0);
        assert_eq!(clock.frame_duration(), Duration::from_micros(16_666));
    }

    #[test]
    fn test_frame_pacing() {
        let mut clock = FrameClock::new(100);
        let t0 = Instant::now();

        assert!(clock.should_tick(t0));
        clock.begin_frame(t0);
        assert!(!clock.should_tick(t0 + Duration::from_millis(5)));
        assert!(clock.should_tick(t0 + Duration::from_millis(10)));
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_stats_record_late_frames() {
        let mut clock = FrameClock::new(100);
        let t0 = Instant::now();

        let start = clock.begin_frame(t0);
        clock.end_frame(start, t0 + Duration::from_millis(2));
        let start = clock.begin_frame(t0 + Duration::from_millis(10));
        clock.end_frame(start, start + Duration::from_millis(25));

        let stats = clock.stats();
        assert_eq!(stats.total_frames, 2);
        assert_eq!(stats.late_frames, 1);
        assert_eq!(stats.min_frame_us, 2_000);
        assert_eq!(stats.max_frame_us, 25_000);

        clock.reset_stats();
        assert_eq!(clock.stats().total_frames, 0);
    }
}
