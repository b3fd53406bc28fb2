//! # TANDEM Networking - Host-Authoritative Two-Peer Sync
//!
//! One process hosts and owns the simulation; one guest connects over a
//! direct data channel, sends its input and draws what the host sends back.
//!
//! ## Architecture
//!
//! - **Transport**: `Discovery` / `PeerIdentity` / `DataChannel` traits plus
//!   an in-memory loopback implementation
//! - **Devices**: keyboard bindings and polled controllers, both reduced to
//!   one `InputState`
//! - **Session**: the idle/hosting/joining/connected state machine
//! - **Simulation**: host-side integration and 30 Hz state broadcast
//! - **Engine**: single-threaded actor draining one event queue
//!
//! ## Authority Model
//!
//! ```text
//! GUEST                              HOST
//!   |                                  |
//!   |--- Input {up,down,left,right} -->|  <- host integrates both slots
//!   |                                  |
//!   |<-- State {players, timestamp} ---|  30 Hz, last-received-wins
//!   |                                  |
//! ```
//!
//! The guest NEVER moves a player. It only mirrors the last snapshot.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tandem_networking::{Engine, EngineConfig, LoopbackNetwork};
//!
//! let network = LoopbackNetwork::new();
//! let mut host = Engine::new(EngineConfig::default(), Box::new(network.clone()))?;
//! host.create_room("Ana")?;
//! host.pump(); // room R1 assigned
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod devices;
pub mod engine;
pub mod error;
pub mod events;
pub mod render;
pub mod session;
pub mod simulation;
pub mod tick;
pub mod transport;

// Re-exports for convenience
pub use config::{ControllerConfig, EngineConfig, SignalingConfig, SignalingEndpoint, SimulationConfig};
pub use devices::{ControllerSnapshot, ControllerSource, KeyCode, KeyOutcome, VirtualControllers};
pub use engine::Engine;
pub use error::{ConfigError, ConfigResult, SessionError, SessionResult, TransportError, TransportResult};
pub use events::{Command, EngineEvent, EventSink};
pub use render::{RenderSink, Scene};
pub use session::{EventLog, LogEntry, Phase, Role, Session};
pub use simulation::SimulationLoop;
pub use tick::{FrameClock, FrameStats};
pub use transport::{
    ChannelEvent, ChannelId, ConnectMetadata, DataChannel, Discovery, DiscoveryEvent,
    LoopbackNetwork, PeerId, PeerIdentity, RoomId, TransportStats,
};

/// Display frame rate the demo paces ticks at.
pub const DISPLAY_HZ: u32 = 60;
