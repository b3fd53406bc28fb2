//! # Simulation & Broadcast
//!
//! The host integrates both player slots from their input vectors once per
//! frame and republishes the result at a fixed rate. The guest never
//! integrates; it only applies snapshots.
//!
//! ## Frame Step
//!
//! ```text
//! axis = (right - left, down - up)
//! step = axis / |axis| * speed * dt        (zero axis: no movement)
//! pos  = clamp(pos + step, padding, extent - padding)   per axis
//! ```
//!
//! `dt` is the real time since the previous frame, clamped so a stalled
//! frame cannot move a player across the arena.
//!
//! ## Broadcast Accumulator
//!
//! Elapsed frame time accumulates while the channel is open. Each time it
//! reaches one period a snapshot is due and one period is subtracted. A
//! remainder of a full period or more is dropped: a slow frame never
//! triggers a burst of catch-up snapshots.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tandem_shared::{Arena, InputState, PlayerState, Players, Vec2};

use crate::config::SimulationConfig;

/// Moves one player by its input over `dt` seconds.
///
/// Returns true if the player moved.
pub fn integrate(
    player: &mut PlayerState,
    input: &InputState,
    dt: f32,
    speed: f32,
    arena: &Arena,
) -> bool {
    let axis = input.axis();
    if axis == Vec2::ZERO {
        return false;
    }
    let step = axis.normalize_or_zero() * (speed * dt);
    player.position = arena.clamp(player.position + step);
    true
}

/// Advances both slots: `host` from `local`, `guest` from `remote`.
pub fn step_players(
    players: &mut Players,
    local: &InputState,
    remote: &InputState,
    dt: f32,
    speed: f32,
    arena: &Arena,
) {
    integrate(&mut players.host, local, dt, speed, arena);
    integrate(&mut players.guest, remote, dt, speed, arena);
}

/// Milliseconds since the unix epoch, for snapshot timestamps.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Loop statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames stepped since start.
    pub frames: u64,
    /// Frames whose step was clamped.
    pub clamped_frames: u64,
    /// Snapshots due since start.
    pub broadcasts: u64,
}

/// Frame timing and broadcast pacing for one session.
#[derive(Debug, Clone)]
pub struct SimulationLoop {
    speed: f32,
    max_step: Duration,
    broadcast_period: Duration,
    running: bool,
    last_frame: Option<Instant>,
    accumulator: Duration,
    stats: LoopStats,
}

impl SimulationLoop {
    /// Creates a stopped loop.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            speed: config.speed,
            max_step: config.max_frame_step(),
            broadcast_period: config.broadcast_period(),
            running: false,
            last_frame: None,
            accumulator: Duration::ZERO,
            stats: LoopStats::default(),
        }
    }

    /// Starts the loop. Starting a running loop is a no-op.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_frame = None;
        self.accumulator = Duration::ZERO;
        self.stats = LoopStats::default();
    }

    /// Stops the loop and forgets its timing.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_frame = None;
        self.accumulator = Duration::ZERO;
    }

    /// True between `start` and `stop`.
    #[inline]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Movement speed in units per second.
    #[inline]
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Interval between snapshots.
    #[inline]
    #[must_use]
    pub const fn broadcast_period(&self) -> Duration {
        self.broadcast_period
    }

    /// Counters since the last start.
    #[must_use]
    pub const fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Records a frame at `now` and returns its clamped step.
    ///
    /// Returns `None` when stopped. The first frame after `start` has a zero
    /// step.
    pub fn advance(&mut self, now: Instant) -> Option<Duration> {
        if !self.running {
            return None;
        }
        let elapsed = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);
        self.stats.frames += 1;

        if elapsed > self.max_step {
            self.stats.clamped_frames += 1;
            return Some(self.max_step);
        }
        Some(elapsed)
    }

    /// Adds a frame step to the broadcast accumulator and reports whether a
    /// snapshot is due.
    pub fn broadcast_due(&mut self, step: Duration) -> bool {
        self.accumulator += step;
        if self.accumulator < self.broadcast_period {
            return false;
        }
        self.accumulator -= self.broadcast_period;
        if self.accumulator >= self.broadcast_period {
            self.accumulator = Duration::ZERO;
        }
        self.stats.broadcasts += 1;
        true
    }
}
