//! # Simulation & Capture Constants
//!
//! Default tuning shared by both peers.
//!
//! **CRITICAL:** Host and guest must agree on the arena. These values are
//! the defaults; `tandem_networking::config` can override them at startup.

// =============================================================================
// ARENA
// =============================================================================

/// Arena width in world units.
pub const ARENA_WIDTH: f32 = 960.0;

/// Arena height in world units.
pub const ARENA_HEIGHT: f32 = 540.0;

/// Distance players are kept from every arena edge.
pub const ARENA_PADDING: f32 = 24.0;

// =============================================================================
// PLAYERS
// =============================================================================

/// Movement speed in world units per second.
pub const PLAYER_SPEED: f32 = 180.0;

/// Collision radius of a player disc.
pub const PLAYER_RADIUS: f32 = 24.0;

/// Host slot color.
pub const HOST_COLOR: &str = "#38bdf8";

/// Guest slot color.
pub const GUEST_COLOR: &str = "#22d3ee";

/// Horizontal spawn position of the host slot, as a fraction of arena width.
pub const HOST_SPAWN_FACTOR: f32 = 0.25;

/// Horizontal spawn position of the guest slot, as a fraction of arena width.
pub const GUEST_SPAWN_FACTOR: f32 = 0.75;

// =============================================================================
// TIMING
// =============================================================================

/// Authoritative snapshots per second sent by the host.
pub const BROADCAST_HZ: u32 = 30;

/// Upper bound on a single frame's delta time, in seconds.
///
/// A stalled frame (tab in background, debugger pause) must not teleport
/// players across the arena.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Controller poll cadence in milliseconds.
pub const CONTROLLER_POLL_INTERVAL_MS: u64 = 16;

/// Analog stick dead zone. Axis values must exceed this magnitude.
pub const CONTROLLER_DEAD_ZONE: f32 = 0.3;

// =============================================================================
// UI
// =============================================================================

/// Maximum number of entries kept in the session event log.
pub const MAX_LOG_ITEMS: usize = 80;

/// Default signaling server path.
pub const DEFAULT_SIGNALING_PATH: &str = "/peerjs";
