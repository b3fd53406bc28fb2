//! # Engine Events
//!
//! Everything that can happen to a session arrives as one [`EngineEvent`] on
//! a single queue and is handled to completion before the next one:
//!
//! ```text
//! frame clock ──► Tick ─────────────┐
//! transport ────► Peer / Channel ───┤
//! input layer ──► Key / Controller* ├──► Engine::pump ──► Session
//! UI ───────────► Command ──────────┘
//! ```
//!
//! Producers only need an [`EventSink`], which is cheap to clone and may be
//! moved to other threads.

use std::time::Instant;

use crossbeam_channel::Sender;

use crate::devices::KeyCode;
use crate::transport::{ChannelEvent, ChannelId, DiscoveryEvent, PeerId};

/// Sending half of the engine queue.
pub type EventSink = Sender<EngineEvent>;

// ============================================================================
// EVENTS
// ============================================================================

/// One unit of work for the engine.
#[derive(Debug)]
pub enum EngineEvent {
    /// A display frame is due.
    Tick(Instant),

    /// Notification from a peer identity.
    Peer {
        /// Identity the event belongs to.
        peer: PeerId,
        /// What happened.
        event: DiscoveryEvent,
    },

    /// Notification from a data channel end.
    Channel {
        /// Channel end the event belongs to.
        channel: ChannelId,
        /// What happened.
        event: ChannelEvent,
    },

    /// A physical key changed state.
    Key {
        /// Which key.
        code: KeyCode,
        /// True on press, false on release.
        pressed: bool,
    },

    /// A controller was plugged in.
    ControllerConnected {
        /// Platform slot index.
        index: usize,
        /// Platform description.
        name: String,
    },

    /// A controller was unplugged.
    ControllerDisconnected {
        /// Platform slot index.
        index: usize,
        /// Platform description.
        name: String,
    },

    /// A user action.
    Command(Command),
}

// ============================================================================
// COMMANDS
// ============================================================================

/// User-initiated session actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Become host of a new room.
    CreateRoom {
        /// Requested display name; blank picks a fallback.
        name: String,
    },
    /// Join an existing room as guest.
    JoinRoom {
        /// Requested display name; blank picks a fallback.
        name: String,
        /// Room id shared by the host.
        room: String,
    },
    /// Send an informational chat line.
    SendChat(String),
    /// Leave the room and return to idle.
    Leave,
}

impl From<Command> for EngineEvent {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}
