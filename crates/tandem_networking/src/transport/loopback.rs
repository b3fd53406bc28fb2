//! In-memory transport.
//!
//! [`LoopbackNetwork`] plays both the signaling service and the wire: peers
//! opened on the same network can dial each other by room id, and frames are
//! delivered by posting events straight onto the receiving engine's queue.
//! Room ids are assigned sequentially (`R1`, `R2`, ...) unless one is
//! requested.
//!
//! Used by the demo binary, the integration tests and the benchmarks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{
    ChannelEvent, ChannelId, ConnectMetadata, DataChannel, Discovery, DiscoveryEvent, PeerId,
    PeerIdentity, RoomId, TransportStats,
};
use crate::error::{TransportError, TransportResult};
use crate::events::{EngineEvent, EventSink};

/// Shared in-memory network. Clones refer to the same network.
#[derive(Clone, Debug, Default)]
pub struct LoopbackNetwork {
    registry: Arc<Mutex<Registry>>,
}

#[derive(Debug, Default)]
struct Registry {
    next_room: u64,
    next_peer: u64,
    next_channel: u64,
    peers: HashMap<RoomId, PeerEntry>,
    ends: HashMap<ChannelId, EndEntry>,
}

#[derive(Debug)]
struct PeerEntry {
    peer: PeerId,
    sink: EventSink,
}

#[derive(Debug)]
struct EndEntry {
    owner: PeerId,
    remote: ChannelId,
    sink: EventSink,
    open: bool,
    stats: TransportStats,
}

impl Registry {
    fn allocate_room(&mut self) -> RoomId {
        loop {
            self.next_room += 1;
            let room = RoomId::new(format!("R{}", self.next_room));
            if !self.peers.contains_key(&room) {
                return room;
            }
        }
    }

    fn allocate_channel(&mut self) -> ChannelId {
        self.next_channel += 1;
        ChannelId(self.next_channel)
    }

    fn post(sink: &EventSink, channel: ChannelId, event: ChannelEvent) {
        // A dropped receiver means that engine is gone; nothing to notify.
        let _ = sink.send(EngineEvent::Channel { channel, event });
    }

    /// Marks both ends of a link closed and notifies each with `event`.
    fn shut(&mut self, id: ChannelId, event: &ChannelEvent) {
        let Some(end) = self.ends.get_mut(&id) else {
            return;
        };
        if !end.open {
            return;
        }
        end.open = false;
        let remote = end.remote;
        Self::post(&end.sink, id, event.clone());

        if let Some(other) = self.ends.get_mut(&remote) {
            other.open = false;
            Self::post(&other.sink, remote, event.clone());
        }
    }

    fn ends_owned_by(&self, peer: PeerId) -> Vec<ChannelId> {
        self.ends
            .iter()
            .filter(|(_, end)| end.owner == peer && end.open)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl LoopbackNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Room ids currently registered, sorted.
    #[must_use]
    pub fn rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.registry.lock().peers.keys().cloned().collect();
        rooms.sort();
        rooms
    }

    /// Number of open links.
    #[must_use]
    pub fn open_links(&self) -> usize {
        self.registry.lock().ends.values().filter(|end| end.open).count() / 2
    }

    /// Simulates the signaling connection of `room`'s owner dropping.
    ///
    /// Returns false if no peer owns `room`.
    pub fn disconnect(&self, room: &RoomId) -> bool {
        let registry = self.registry.lock();
        let Some(entry) = registry.peers.get(room) else {
            return false;
        };
        let _ = entry.sink.send(EngineEvent::Peer {
            peer: entry.peer,
            event: DiscoveryEvent::Disconnected,
        });
        true
    }

    /// Simulates a signaling error reported to `room`'s owner.
    pub fn signal_error(&self, room: &RoomId, reason: &str) -> bool {
        let registry = self.registry.lock();
        let Some(entry) = registry.peers.get(room) else {
            return false;
        };
        let _ = entry.sink.send(EngineEvent::Peer {
            peer: entry.peer,
            event: DiscoveryEvent::Error(reason.to_owned()),
        });
        true
    }

    /// Fails every open link owned by `room`'s peer. Both ends receive
    /// [`ChannelEvent::Error`] and the links stop carrying frames.
    ///
    /// Returns the number of links failed.
    pub fn fail_links(&self, room: &RoomId, reason: &str) -> usize {
        let mut registry = self.registry.lock();
        let Some(peer) = registry.peers.get(room).map(|entry| entry.peer) else {
            return 0;
        };
        let ends = registry.ends_owned_by(peer);
        let event = ChannelEvent::Error(reason.to_owned());
        for id in &ends {
            registry.shut(*id, &event);
        }
        ends.len()
    }
}

impl Discovery for LoopbackNetwork {
    fn open(
        &mut self,
        requested: Option<RoomId>,
        sink: EventSink,
    ) -> TransportResult<Box<dyn PeerIdentity>> {
        let mut registry = self.registry.lock();
        let room = match requested.filter(|room| !room.is_empty()) {
            Some(room) if registry.peers.contains_key(&room) => {
                return Err(TransportError::RoomTaken(room));
            }
            Some(room) => room,
            None => registry.allocate_room(),
        };

        registry.next_peer += 1;
        let peer = PeerId(registry.next_peer);
        let _ = sink.send(EngineEvent::Peer {
            peer,
            event: DiscoveryEvent::IdentityAssigned(room.clone()),
        });
        registry.peers.insert(room.clone(), PeerEntry { peer, sink });
        debug!(%peer, %room, "Loopback identity registered");

        Ok(Box::new(LoopbackIdentity {
            network: self.clone(),
            peer,
            room,
            destroyed: false,
        }))
    }

    fn describe(&self) -> String {
        String::from("in-process loopback")
    }
}

/// Identity registered on a [`LoopbackNetwork`].
#[derive(Debug)]
pub struct LoopbackIdentity {
    network: LoopbackNetwork,
    peer: PeerId,
    room: RoomId,
    destroyed: bool,
}

impl PeerIdentity for LoopbackIdentity {
    fn id(&self) -> PeerId {
        self.peer
    }

    fn connect(
        &mut self,
        room: &RoomId,
        metadata: ConnectMetadata,
    ) -> TransportResult<Box<dyn DataChannel>> {
        if self.destroyed {
            return Err(TransportError::IdentityDestroyed);
        }
        let mut registry = self.network.registry.lock();
        let (target_peer, target_sink) = match registry.peers.get(room) {
            Some(entry) if entry.peer != self.peer => (entry.peer, entry.sink.clone()),
            _ => return Err(TransportError::UnknownRoom(room.clone())),
        };
        let own_sink = registry
            .peers
            .get(&self.room)
            .map(|entry| entry.sink.clone())
            .ok_or(TransportError::IdentityDestroyed)?;

        let local = registry.allocate_channel();
        let remote = registry.allocate_channel();
        registry.ends.insert(
            local,
            EndEntry {
                owner: self.peer,
                remote,
                sink: own_sink.clone(),
                open: true,
                stats: TransportStats::default(),
            },
        );
        registry.ends.insert(
            remote,
            EndEntry {
                owner: target_peer,
                remote: local,
                sink: target_sink.clone(),
                open: true,
                stats: TransportStats::default(),
            },
        );

        let inbound = LoopbackChannel {
            network: self.network.clone(),
            id: remote,
            metadata: Some(metadata.clone()),
        };
        let _ = target_sink.send(EngineEvent::Peer {
            peer: target_peer,
            event: DiscoveryEvent::Connection(Box::new(inbound)),
        });
        Registry::post(&target_sink, remote, ChannelEvent::Open);
        Registry::post(&own_sink, local, ChannelEvent::Open);
        debug!(from = %self.room, to = %room, %local, %remote, "Loopback link established");

        Ok(Box::new(LoopbackChannel {
            network: self.network.clone(),
            id: local,
            metadata: Some(metadata),
        }))
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        let mut registry = self.network.registry.lock();
        if registry
            .peers
            .get(&self.room)
            .is_some_and(|entry| entry.peer == self.peer)
        {
            registry.peers.remove(&self.room);
        }
        for id in registry.ends_owned_by(self.peer) {
            registry.shut(id, &ChannelEvent::Close);
        }
        debug!(peer = %self.peer, room = %self.room, "Loopback identity destroyed");
    }
}

/// One end of a loopback link.
#[derive(Debug)]
pub struct LoopbackChannel {
    network: LoopbackNetwork,
    id: ChannelId,
    metadata: Option<ConnectMetadata>,
}

impl DataChannel for LoopbackChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.network
            .registry
            .lock()
            .ends
            .get(&self.id)
            .is_some_and(|end| end.open)
    }

    fn send(&mut self, frame: &[u8]) -> TransportResult<()> {
        let mut registry = self.network.registry.lock();
        let Some(end) = registry.ends.get_mut(&self.id) else {
            return Err(TransportError::ChannelClosed(self.id));
        };
        if !end.open {
            end.stats.send_errors += 1;
            return Err(TransportError::ChannelClosed(self.id));
        }
        end.stats.frames_sent += 1;
        end.stats.bytes_sent += frame.len() as u64;
        let remote = end.remote;

        if let Some(other) = registry.ends.get_mut(&remote) {
            other.stats.frames_received += 1;
            other.stats.bytes_received += frame.len() as u64;
            Registry::post(&other.sink, remote, ChannelEvent::Data(frame.to_vec()));
        }
        trace!(channel = %self.id, bytes = frame.len(), "Loopback frame sent");
        Ok(())
    }

    fn close(&mut self) {
        self.network.registry.lock().shut(self.id, &ChannelEvent::Close);
    }

    fn metadata(&self) -> Option<&ConnectMetadata> {
        self.metadata.as_ref()
    }

    fn stats(&self) -> TransportStats {
        self.network
            .registry
            .lock()
            .ends
            .get(&self.id)
            .map(|end| end.stats)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};

    fn drain(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
        rx.try_iter().collect()
    }

    fn assigned_room(events: &[EngineEvent]) -> Option<RoomId> {
        events.iter().find_map(|event| match event {
            EngineEvent::Peer {
                event: DiscoveryEvent::IdentityAssigned(room),
                ..
            } => Some(room.clone()),
            _ => None,
        })
    }

    #[test]
    fn test_sequential_room_ids() {
        let mut network = LoopbackNetwork::new();
        let (tx, rx) = unbounded();

        let _first = network.open(None, tx.clone()).unwrap();
        let _second = network.open(None, tx).unwrap();

        let events = drain(&rx);
        assert_eq!(events.len(), 2);
        assert_eq!(network.rooms(), vec![RoomId::new("R1"), RoomId::new("R2")]);
    }

    #[test]
    fn test_requested_room_taken() {
        let mut network = LoopbackNetwork::new();
        let (tx, _rx) = unbounded();

        let _owner = network.open(Some(RoomId::new("arena")), tx.clone()).unwrap();
        let err = network.open(Some(RoomId::new("arena")), tx).unwrap_err();
        assert_eq!(err, TransportError::RoomTaken(RoomId::new("arena")));
    }

    #[test]
    fn test_connect_errors() {
        let mut network = LoopbackNetwork::new();
        let (tx, _rx) = unbounded();
        let _host = network.open(None, tx.clone()).unwrap();
        let mut guest = network.open(None, tx).unwrap();

        let err = guest.connect(&RoomId::new("R9"), ConnectMetadata::default()).unwrap_err();
        assert_eq!(err, TransportError::UnknownRoom(RoomId::new("R9")));

        guest.destroy();
        let err = guest.connect(&RoomId::new("R1"), ConnectMetadata::default()).unwrap_err();
        assert_eq!(err, TransportError::IdentityDestroyed);

        let wrapped = crate::error::SessionError::from(err);
        assert_eq!(wrapped.to_string(), "peer identity has been destroyed");
    }

    #[test]
    fn test_connect_delivers_connection_and_frames() {
        let mut network = LoopbackNetwork::new();
        let (host_tx, host_rx) = unbounded();
        let (guest_tx, guest_rx) = unbounded();

        let _host = network.open(None, host_tx).unwrap();
        let room = assigned_room(&drain(&host_rx)).unwrap();
        let mut guest = network.open(None, guest_tx).unwrap();
        drain(&guest_rx);

        let mut outbound = guest.connect(&room, ConnectMetadata::named("Bo")).unwrap();
        assert!(outbound.is_open());

        let mut host_events = drain(&host_rx).into_iter();
        let mut inbound = match host_events.next() {
            Some(EngineEvent::Peer {
                event: DiscoveryEvent::Connection(channel),
                ..
            }) => channel,
            other => panic!("expected connection, got {other:?}"),
        };
        assert!(matches!(
            host_events.next(),
            Some(EngineEvent::Channel { event: ChannelEvent::Open, .. })
        ));
        assert_eq!(inbound.metadata().unwrap().name, "Bo");
        assert!(matches!(
            drain(&guest_rx).as_slice(),
            [EngineEvent::Channel { event: ChannelEvent::Open, .. }]
        ));

        outbound.send(b"hello").unwrap();
        inbound.send(b"back").unwrap();

        assert!(matches!(
            drain(&host_rx).as_slice(),
            [EngineEvent::Channel { event: ChannelEvent::Data(data), .. }] if data == b"hello"
        ));
        assert!(matches!(
            drain(&guest_rx).as_slice(),
            [EngineEvent::Channel { event: ChannelEvent::Data(data), .. }] if data == b"back"
        ));
        assert_eq!(outbound.stats().frames_sent, 1);
        assert_eq!(outbound.stats().frames_received, 1);
    }

    #[test]
    fn test_close_notifies_both_ends_once() {
        let mut network = LoopbackNetwork::new();
        let (host_tx, host_rx) = unbounded();
        let (guest_tx, guest_rx) = unbounded();

        let _host = network.open(None, host_tx).unwrap();
        let mut guest = network.open(None, guest_tx).unwrap();
        let mut channel = guest.connect(&RoomId::new("R1"), ConnectMetadata::default()).unwrap();
        drain(&host_rx);
        drain(&guest_rx);

        channel.close();
        channel.close();

        assert!(!channel.is_open());
        assert_eq!(network.open_links(), 0);
        assert_eq!(drain(&host_rx).len(), 1);
        assert_eq!(drain(&guest_rx).len(), 1);
        assert_eq!(
            channel.send(b"late"),
            Err(TransportError::ChannelClosed(channel.id()))
        );
    }

    #[test]
    fn test_destroy_unregisters_and_closes_links() {
        let mut network = LoopbackNetwork::new();
        let (host_tx, _host_rx) = unbounded();
        let (guest_tx, guest_rx) = unbounded();

        let mut host = network.open(None, host_tx).unwrap();
        let mut guest = network.open(None, guest_tx).unwrap();
        let channel = guest.connect(&RoomId::new("R1"), ConnectMetadata::default()).unwrap();
        drain(&guest_rx);

        host.destroy();

        assert!(!channel.is_open());
        assert_eq!(network.rooms(), vec![RoomId::new("R2")]);
        assert!(matches!(
            drain(&guest_rx).as_slice(),
            [EngineEvent::Channel { event: ChannelEvent::Close, .. }]
        ));
        assert_eq!(
            guest.connect(&RoomId::new("R1"), ConnectMetadata::default()).unwrap_err(),
            TransportError::UnknownRoom(RoomId::new("R1"))
        );
    }

    #[test]
    fn test_fail_links_reports_error() {
        let mut network = LoopbackNetwork::new();
        let (host_tx, host_rx) = unbounded();
        let (guest_tx, _guest_rx) = unbounded();

        let _host = network.open(None, host_tx).unwrap();
        let mut guest = network.open(None, guest_tx).unwrap();
        let _channel = guest.connect(&RoomId::new("R1"), ConnectMetadata::default()).unwrap();
        drain(&host_rx);

        assert_eq!(network.fail_links(&RoomId::new("R2"), "ice failed"), 1);
        let events = drain(&host_rx);
        assert!(matches!(
            events.as_slice(),
            [EngineEvent::Channel { event: ChannelEvent::Error(reason), .. }] if reason == "ice failed"
        ));
    }
}
