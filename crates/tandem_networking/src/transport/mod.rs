//! # Transport Layer
//!
//! The engine talks to the network through three small traits:
//!
//! - [`Discovery`] hands out a [`PeerIdentity`] bound to a room id.
//! - [`PeerIdentity`] opens outbound [`DataChannel`]s and is destroyed on
//!   teardown.
//! - [`DataChannel`] is an ordered, reliable, bidirectional byte stream.
//!
//! ## Event Delivery
//!
//! Nothing in this layer calls back into the engine. Asynchronous
//! notifications are posted to the engine's queue as [`EngineEvent`]s,
//! tagged with the [`PeerId`] or [`ChannelId`] they belong to:
//!
//! ```text
//! transport ──(EventSink)──► EngineEvent::Peer    { peer, DiscoveryEvent }
//!                         └► EngineEvent::Channel { channel, ChannelEvent }
//! ```
//!
//! The tags let the session ignore late events from an identity or channel it
//! has already dropped.
//!
//! [`EngineEvent`]: crate::events::EngineEvent

pub mod loopback;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportResult;
use crate::events::EventSink;

pub use loopback::LoopbackNetwork;

/// Room id handed out by the discovery layer. The host's id is the room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a room id, trimming surrounding whitespace.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_owned())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is blank.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Process-local handle of a peer identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Process-local handle of one end of a data channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Metadata a guest attaches when dialing a room.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectMetadata {
    /// The guest's display name.
    pub name: String,
}

impl ConnectMetadata {
    /// Metadata carrying a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Notifications from a peer identity.
#[derive(Debug)]
pub enum DiscoveryEvent {
    /// The identity is registered; the payload is its room id.
    IdentityAssigned(RoomId),
    /// A remote peer dialed this identity.
    Connection(Box<dyn DataChannel>),
    /// The identity lost its signaling connection.
    Disconnected,
    /// Signaling reported an error.
    Error(String),
}

/// Notifications from a data channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Both ends can now send.
    Open,
    /// One frame arrived.
    Data(Vec<u8>),
    /// The channel is closed for good.
    Close,
    /// The channel failed.
    Error(String),
}

/// Counters kept per channel end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
}

/// Ordered, reliable, bidirectional frame stream between two peers.
pub trait DataChannel: Send + fmt::Debug {
    /// This end's id. Events for this end carry the same id.
    fn id(&self) -> ChannelId;

    /// Returns true once both ends may send and until either closes.
    fn is_open(&self) -> bool;

    /// Sends one frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ChannelClosed`](crate::TransportError::ChannelClosed)
    /// if the channel is not open.
    fn send(&mut self, frame: &[u8]) -> TransportResult<()>;

    /// Closes the channel. Closing twice is a no-op.
    fn close(&mut self);

    /// Metadata the dialing side attached, if any.
    fn metadata(&self) -> Option<&ConnectMetadata>;

    /// Counters for this end.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

/// A registered peer, addressable by its room id.
pub trait PeerIdentity: Send + fmt::Debug {
    /// Handle used to tag this identity's events.
    fn id(&self) -> PeerId;

    /// Dials `room`. The returned channel emits [`ChannelEvent::Open`] once
    /// usable.
    ///
    /// # Errors
    ///
    /// Fails if the identity was destroyed or the room is unreachable.
    fn connect(&mut self, room: &RoomId, metadata: ConnectMetadata)
        -> TransportResult<Box<dyn DataChannel>>;

    /// Unregisters the identity and closes every channel it owns.
    fn destroy(&mut self);
}

/// Factory for peer identities.
pub trait Discovery: Send {
    /// Registers a new identity. `requested` asks for a specific room id;
    /// `None` lets the discovery layer pick one. The assigned id arrives as
    /// [`DiscoveryEvent::IdentityAssigned`] on `sink`.
    ///
    /// # Errors
    ///
    /// Fails if the identity cannot be registered.
    fn open(&mut self, requested: Option<RoomId>, sink: EventSink)
        -> TransportResult<Box<dyn PeerIdentity>>;

    /// Human-readable description of the signaling endpoint, for logs.
    fn describe(&self) -> String {
        String::from("default signaling cloud")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_trims() {
        let room = RoomId::new("  R7 \n");
        assert_eq!(room.as_str(), "R7");
        assert_eq!(room.to_string(), "R7");
        assert!(RoomId::new("   ").is_empty());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(PeerId(3).to_string(), "peer#3");
        assert_eq!(ChannelId(9).to_string(), "channel#9");
    }
}
