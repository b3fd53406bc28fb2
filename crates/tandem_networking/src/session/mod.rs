//! # Session Manager
//!
//! One [`Session`] per process. It owns the peer identity, the data channel,
//! both input vectors, both player slots and the loop state, and it is the
//! only thing that changes [`Role`].
//!
//! ## State Machine
//!
//! ```text
//!              create room              first inbound connection
//!   ┌──────┐ ─────────────► ┌─────────┐ ───────────────────────► ┌──────────────────┐
//!   │      │                │ Hosting │ ◄─────────────────────── │ Connected (host) │
//!   │ Idle │                └─────────┘  guest left, room kept   └──────────────────┘
//!   │      │   join room    ┌─────────┐      channel open        ┌──────────────────┐
//!   │      │ ─────────────► │ Joining │ ───────────────────────► │ Connected (guest)│
//!   └──────┘                └─────────┘                          └──────────────────┘
//!      ▲
//!      └──── leave / channel close or error / signaling lost (from any state)
//! ```
//!
//! Teardown always lands in a clean `Idle`: channel closed, identity
//! destroyed, inputs cleared, both slots back at spawn, loop stopped.

mod dispatch;
mod log;

use std::fmt;

use rand::Rng;
use tandem_shared::{Arena, InputState, Message, Players};
use tracing::{debug, info, warn};

pub use log::{EventLog, LogEntry};

use crate::config::EngineConfig;
use crate::devices::ControllerHub;
use crate::error::{SessionError, SessionResult};
use crate::events::EventSink;
use crate::render::{mode_text, slot_labels, Scene};
use crate::simulation::SimulationLoop;
use crate::transport::{DataChannel, Discovery, PeerIdentity, RoomId, TransportStats};

/// Which side of the session this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// No session.
    Idle,
    /// Owns the simulation.
    Host,
    /// Mirrors the host.
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Host => "host",
            Self::Guest => "guest",
        })
    }
}

/// Lifecycle phase. Refines [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No session.
    Idle,
    /// Host waiting for a guest.
    Hosting,
    /// Guest dialing a room.
    Joining,
    /// A peer is attached.
    Connected,
}

/// Session state owned by the engine.
#[derive(Debug)]
pub struct Session {
    arena: Arena,
    phase: Phase,
    role: Role,
    identity: Option<Box<dyn PeerIdentity>>,
    channel: Option<Box<dyn DataChannel>>,
    room_id: Option<RoomId>,
    share_id: Option<RoomId>,
    local_name: String,
    remote_name: String,
    local: InputState,
    remote: InputState,
    players: Players,
    simulation: SimulationLoop,
    controllers: ControllerHub,
    status: String,
    log: EventLog,
}

impl Session {
    /// Creates an idle session. `config` must already be validated.
    #[must_use]
    pub(crate) fn new(config: &EngineConfig) -> Self {
        Self {
            arena: config.arena,
            phase: Phase::Idle,
            role: Role::Idle,
            identity: None,
            channel: None,
            room_id: None,
            share_id: None,
            local_name: String::new(),
            remote_name: String::new(),
            local: InputState::IDLE,
            remote: InputState::IDLE,
            players: Players::spawn(&config.arena),
            simulation: SimulationLoop::new(&config.simulation),
            controllers: ControllerHub::new(
                config.controllers.dead_zone,
                config.controllers.poll_interval(),
            ),
            status: String::from("Offline."),
            log: EventLog::new(config.log_capacity),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Current role.
    #[inline]
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// True only while idle: create, join and the signaling fields are
    /// usable.
    #[must_use]
    pub fn controls_enabled(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Host: its own room id once assigned. Guest: the room being joined.
    #[must_use]
    pub const fn room_id(&self) -> Option<&RoomId> {
        self.room_id.as_ref()
    }

    /// Room id to show for sharing.
    #[must_use]
    pub const fn share_id(&self) -> Option<&RoomId> {
        self.share_id.as_ref()
    }

    /// This process's display name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// The peer's display name, empty until known.
    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Combined keyboard and controller input of this process.
    #[must_use]
    pub const fn local_input(&self) -> &InputState {
        &self.local
    }

    /// The peer's input. Only meaningful on the host.
    #[must_use]
    pub const fn remote_input(&self) -> &InputState {
        &self.remote
    }

    /// Both player slots.
    #[must_use]
    pub const fn players(&self) -> &Players {
        &self.players
    }

    /// Play area.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Status line.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Event log.
    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Frame loop state.
    #[must_use]
    pub const fn simulation(&self) -> &SimulationLoop {
        &self.simulation
    }

    /// Controller bindings.
    #[must_use]
    pub const fn controllers(&self) -> &ControllerHub {
        &self.controllers
    }

    /// True if a peer is attached and its channel is open.
    #[must_use]
    pub fn is_channel_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|channel| channel.is_open())
    }

    /// True if a channel is attached, open or not.
    #[must_use]
    pub const fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Counters of the attached channel.
    #[must_use]
    pub fn channel_stats(&self) -> Option<TransportStats> {
        self.channel.as_ref().map(|channel| channel.stats())
    }

    /// What a renderer should draw right now.
    #[must_use]
    pub fn scene(&self) -> Scene<'_> {
        let (host_label, guest_label) = slot_labels(self.role, &self.local_name, &self.remote_name);
        Scene {
            arena: &self.arena,
            players: &self.players,
            host_label,
            guest_label,
            mode: mode_text(self.role),
        }
    }

    // ========================================================================
    // USER ACTIONS
    // ========================================================================

    /// Becomes host of a new room.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] if a session is active; a transport error if
    /// the identity cannot be registered (the session is then back to idle).
    pub fn create_room(
        &mut self,
        name: &str,
        discovery: &mut dyn Discovery,
        sink: EventSink,
    ) -> SessionResult<()> {
        self.ensure_idle()?;
        self.log.clear();
        self.local_name = ensure_name(name);
        self.role = Role::Host;
        self.phase = Phase::Hosting;
        self.players.reset(&self.arena);
        self.sync_names();
        self.set_status("Creating P2P room...");
        self.record(format!(
            "Initializing host peer ({})...",
            discovery.describe()
        ));

        match discovery.open(None, sink) {
            Ok(identity) => {
                info!(peer = %identity.id(), name = %self.local_name, "Hosting");
                self.identity = Some(identity);
                Ok(())
            }
            Err(err) => {
                self.teardown(Some(&format!("Failed to create room: {err}")));
                Err(err.into())
            }
        }
    }

    /// Joins `room` as guest.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] if a session is active,
    /// [`SessionError::EmptyRoomId`] for a blank room id, or a transport
    /// error if the identity cannot be registered.
    pub fn join_room(
        &mut self,
        name: &str,
        room: &str,
        discovery: &mut dyn Discovery,
        sink: EventSink,
    ) -> SessionResult<()> {
        self.ensure_idle()?;
        let room = RoomId::new(room);
        if room.is_empty() {
            self.set_status("Enter a room ID to join.");
            return Err(SessionError::EmptyRoomId);
        }

        self.log.clear();
        self.local_name = ensure_name(name);
        self.role = Role::Guest;
        self.phase = Phase::Joining;
        self.players.reset(&self.arena);
        self.room_id = Some(room.clone());
        self.share_id = Some(room.clone());
        self.set_status(format!("Connecting to room {room}..."));
        self.record(format!(
            "Initializing guest peer ({})...",
            discovery.describe()
        ));

        match discovery.open(None, sink) {
            Ok(identity) => {
                info!(peer = %identity.id(), %room, name = %self.local_name, "Joining");
                self.identity = Some(identity);
                Ok(())
            }
            Err(err) => {
                self.teardown(Some(&format!("Failed to join room: {err}")));
                Err(err.into())
            }
        }
    }

    /// Sends a chat line to the peer and logs it locally.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] if no channel is open.
    pub fn send_chat(&mut self, text: &str) -> SessionResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        if !self.is_channel_open() {
            return Err(SessionError::NotConnected);
        }
        let message = Message::Chat {
            author: self.local_name.clone(),
            text: text.to_owned(),
        };
        self.send(&message);
        self.record(format!("{}: {text}", self.local_name));
        Ok(())
    }

    /// Leaves the room. Returns false if already idle.
    pub fn leave(&mut self) -> bool {
        if self.phase == Phase::Idle {
            return false;
        }
        self.teardown(Some("Left the room."));
        true
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    fn ensure_idle(&mut self) -> SessionResult<()> {
        if self.phase == Phase::Idle {
            return Ok(());
        }
        self.set_status("Already in a session. Leave it first.");
        Err(SessionError::Busy)
    }

    /// Returns to idle from any state.
    pub(crate) fn teardown(&mut self, reason: Option<&str>) {
        match reason {
            Some(reason) => {
                self.record(reason);
                self.set_status(reason);
            }
            None => self.set_status("Offline."),
        }

        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(mut identity) = self.identity.take() {
            identity.destroy();
        }
        self.simulation.stop();
        self.role = Role::Idle;
        self.phase = Phase::Idle;
        self.room_id = None;
        self.share_id = None;
        self.remote_name.clear();
        self.local.clear();
        self.remote.clear();
        self.players.reset(&self.arena);
        info!("Session torn down");
    }

    /// Host only: the guest went away. The room stays open for a new guest.
    pub(crate) fn guest_left(&mut self, reason: &str) {
        self.record(reason);
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.phase = Phase::Hosting;
        self.remote_name.clear();
        self.remote.clear();
        self.players.reset_slot(tandem_shared::Slot::Guest, &self.arena);
        self.sync_names();

        let status = match &self.room_id {
            Some(room) => format!("Guest left. Share the ID {room} to play again."),
            None => String::from("Guest left."),
        };
        self.set_status(status);
        info!("Guest left; awaiting a new guest");
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Encodes and sends `message` if a channel is open. Returns true if the
    /// frame was handed to the channel.
    pub(crate) fn send(&mut self, message: &Message) -> bool {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(tag = message.tag(), error = %err, "Encode failed");
                self.record(format!("Failed to encode {} message: {err}", message.tag()));
                return false;
            }
        };

        let result = match self.channel.as_mut() {
            Some(channel) if channel.is_open() => channel.send(&frame),
            _ => return false,
        };
        match result {
            Ok(()) => {
                debug!(tag = message.tag(), bytes = frame.len(), "Sent");
                true
            }
            Err(err) => {
                warn!(tag = message.tag(), error = %err, "Send failed");
                self.record(format!("Failed to send {} message: {err}", message.tag()));
                false
            }
        }
    }

    /// Host only: mirrors the known display names into the player slots.
    fn sync_names(&mut self) {
        if self.role == Role::Host {
            self.players.host.name.clone_from(&self.local_name);
            self.players.guest.name.clone_from(&self.remote_name);
        }
    }

    fn record(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(target: "tandem::log", "{text}");
        self.log.push(text);
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        debug!(status = %self.status, "Status");
    }
}

/// `name` trimmed, or `Player-NNN` if blank.
#[must_use]
pub fn ensure_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("Player-{}", rand::thread_rng().gen_range(100..=999))
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackNetwork;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_ensure_name() {
        assert_eq!(ensure_name("  Ana "), "Ana");

        let fallback = ensure_name("   ");
        let number: u32 = fallback.strip_prefix("Player-").unwrap().parse().unwrap();
        assert!((100..=999).contains(&number));
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new(&EngineConfig::default());

        assert_eq!(session.role(), Role::Idle);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.controls_enabled());
        assert!(!session.has_channel());
        assert_eq!(session.scene().mode, "offline");
    }

    #[test]
    fn test_second_create_rejected() {
        let mut network = LoopbackNetwork::new();
        let (tx, _rx) = unbounded();
        let mut session = Session::new(&EngineConfig::default());

        session.create_room("Ana", &mut network, tx.clone()).unwrap();
        let err = session.create_room("Ana", &mut network, tx.clone()).unwrap_err();
        assert!(matches!(err, SessionError::Busy));
        let err = session.join_room("Ana", "R9", &mut network, tx).unwrap_err();
        assert!(matches!(err, SessionError::Busy));

        assert_eq!(session.role(), Role::Host);
        assert_eq!(network.rooms().len(), 1);
    }

    #[test]
    fn test_empty_room_rejected() {
        let mut network = LoopbackNetwork::new();
        let (tx, _rx) = unbounded();
        let mut session = Session::new(&EngineConfig::default());

        let err = session.join_room("Bo", "   ", &mut network, tx).unwrap_err();

        assert!(matches!(err, SessionError::EmptyRoomId));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.status(), "Enter a room ID to join.");
        assert!(network.rooms().is_empty());
    }

    #[test]
    fn test_chat_requires_channel() {
        let mut session = Session::new(&EngineConfig::default());
        assert!(matches!(session.send_chat("hi"), Err(SessionError::NotConnected)));
        assert!(session.send_chat("   ").is_ok());
    }

    #[test]
    fn test_leave_when_idle() {
        let mut session = Session::new(&EngineConfig::default());
        assert!(!session.leave());
    }
}
