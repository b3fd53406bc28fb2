//! Event handlers: transport notifications, protocol messages, devices and
//! frame ticks.
//!
//! Every handler re-checks role and channel before acting, so a late event
//! for a torn-down session is a no-op.

use std::time::Instant;

use tandem_shared::{InputState, Message, ProtocolError, StateSnapshot};
use tracing::{debug, info, warn};

use super::{Phase, Role, Session};
use crate::devices::{apply_key, Binding, ControllerSnapshot, KeyCode, KeyOutcome};
use crate::simulation::{step_players, unix_millis};
use crate::transport::{ChannelEvent, ChannelId, ConnectMetadata, DataChannel, DiscoveryEvent, PeerId, RoomId};

impl Session {
    // ========================================================================
    // DISCOVERY
    // ========================================================================

    /// Handles a notification from a peer identity.
    pub fn on_peer_event(&mut self, peer: PeerId, event: DiscoveryEvent) {
        if self.identity.as_ref().map(|identity| identity.id()) != Some(peer) {
            debug!(%peer, "Ignoring event from stale identity");
            if let DiscoveryEvent::Connection(mut channel) = event {
                channel.close();
            }
            return;
        }

        match event {
            DiscoveryEvent::IdentityAssigned(room) => self.identity_assigned(room),
            DiscoveryEvent::Connection(channel) => self.inbound_connection(channel),
            DiscoveryEvent::Disconnected => {
                warn!(%peer, "Signaling connection lost");
                self.teardown(Some("Disconnected from signaling server."));
            }
            DiscoveryEvent::Error(reason) => self.identity_error(&reason),
        }
    }

    fn identity_assigned(&mut self, room: RoomId) {
        match self.role {
            Role::Host => {
                self.set_status(format!("Room created! Share the ID: {room}"));
                self.record(format!("Host peer ready. Room ID: {room}"));
                info!(%room, "Room created");
                self.room_id = Some(room.clone());
                self.share_id = Some(room);
                self.start_loop();
            }
            Role::Guest => {
                self.record(format!("Guest peer ready ({room})."));
                self.dial_host();
            }
            Role::Idle => {}
        }
    }

    fn dial_host(&mut self) {
        let Some(target) = self.room_id.clone() else {
            self.teardown(Some("No room to connect to."));
            return;
        };
        let metadata = ConnectMetadata::named(self.local_name.clone());
        let result = match self.identity.as_mut() {
            Some(identity) => identity.connect(&target, metadata),
            None => return,
        };

        match result {
            Ok(channel) => {
                debug!(channel = %channel.id(), room = %target, "Dialing host");
                self.channel = Some(channel);
                self.set_status(format!("Connecting to host {target}..."));
            }
            Err(err) => {
                warn!(room = %target, error = %err, "Dial failed");
                self.teardown(Some(&format!("Could not connect to room {target}: {err}")));
            }
        }
    }

    fn inbound_connection(&mut self, mut channel: Box<dyn DataChannel>) {
        if self.role != Role::Host || self.channel.is_some() {
            warn!(channel = %channel.id(), "Refusing additional connection");
            self.record("Additional guest tried to join. Connection refused.");
            channel.close();
            return;
        }

        self.remote_name = channel
            .metadata()
            .map(|metadata| metadata.name.trim().to_owned())
            .unwrap_or_default();
        let name = self.remote_display_name();
        self.record(format!("Guest connected ({name})."));
        self.set_status(format!("Guest {name} is connecting..."));
        info!(channel = %channel.id(), guest = %name, "Guest attached");

        self.channel = Some(channel);
        self.phase = Phase::Connected;
        self.sync_names();
    }

    fn identity_error(&mut self, reason: &str) {
        warn!(%reason, "Signaling error");
        let message = format!("Signaling error: {reason}");
        if self.phase == Phase::Connected {
            self.record(message.as_str());
            self.set_status(message);
        } else {
            self.teardown(Some(&message));
        }
    }

    // ========================================================================
    // CHANNEL
    // ========================================================================

    /// Handles a notification from a data channel end.
    pub fn on_channel_event(&mut self, channel: ChannelId, event: ChannelEvent) {
        if self.channel.as_ref().map(|attached| attached.id()) != Some(channel) {
            debug!(%channel, ?event, "Ignoring event from stale channel");
            return;
        }

        match event {
            ChannelEvent::Open => self.channel_open(),
            ChannelEvent::Data(frame) => self.on_frame(&frame),
            ChannelEvent::Close => match self.role {
                Role::Host => self.guest_left("Guest left the room."),
                Role::Guest => self.teardown(Some("Connection to host closed.")),
                Role::Idle => {}
            },
            ChannelEvent::Error(reason) => {
                warn!(%channel, %reason, "Channel error");
                self.record(format!("Channel error: {reason}"));
                match self.role {
                    Role::Host => self.guest_left("Guest disconnected due to an error."),
                    Role::Guest => self.teardown(Some("Connection error with host.")),
                    Role::Idle => {}
                }
            }
        }
    }

    fn channel_open(&mut self) {
        match self.role {
            Role::Host => {
                let name = self.remote_display_name();
                self.set_status(format!("Guest connected: {name}"));
                self.record(format!("P2P channel ready with {name}."));
                let welcome = Message::Welcome {
                    host_name: self.local_name.clone(),
                    room_id: self
                        .room_id
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                };
                self.send(&welcome);
            }
            Role::Guest => {
                self.phase = Phase::Connected;
                self.set_status("Connected to host! Waiting for sync...");
                self.record("Connection established with host.");
                let intro = Message::Intro {
                    guest_name: self.local_name.clone(),
                };
                self.send(&intro);
                if !self.local.is_idle() {
                    self.send(&Message::Input { state: self.local });
                }
                self.start_loop();
            }
            Role::Idle => {}
        }
    }

    fn on_frame(&mut self, frame: &[u8]) {
        match Message::decode(frame) {
            Ok(message) => {
                debug!(tag = message.tag(), bytes = frame.len(), "Received");
                self.on_message(message);
            }
            Err(ProtocolError::UnknownTag(tag)) => {
                warn!(%tag, "Unrecognized message");
                self.record(format!("Unrecognized message: {tag}"));
            }
            Err(err) => {
                warn!(error = %err, "Dropped malformed frame");
                self.record(format!("Dropped malformed message: {err}"));
            }
        }
    }

    fn on_message(&mut self, message: Message) {
        match message {
            Message::State(StateSnapshot { players, timestamp }) => {
                if self.role == Role::Guest {
                    self.players = players;
                    debug!(timestamp, "Applied host state");
                }
            }
            Message::Input { state } => {
                if self.role == Role::Host {
                    self.remote = state;
                }
            }
            Message::Welcome { host_name, room_id } => {
                let host_name = host_name.trim();
                if !host_name.is_empty() {
                    self.remote_name = host_name.to_owned();
                    self.record(format!("Host identified as {host_name}."));
                    self.set_status(format!("Connected to {host_name}. Waiting for state..."));
                }
                let room = RoomId::new(room_id);
                if !room.is_empty() {
                    self.share_id = Some(room);
                }
            }
            Message::Intro { guest_name } => {
                let guest_name = guest_name.trim();
                if !guest_name.is_empty() {
                    self.remote_name = guest_name.to_owned();
                    self.sync_names();
                }
                let name = self.remote_display_name();
                self.record(format!("{name} joined the room."));
                self.set_status(format!("Player connected: {name}"));
            }
            Message::Chat { author, text } => {
                if !text.is_empty() {
                    let author = if author.trim().is_empty() { "Remote" } else { author.trim() };
                    self.record(format!("{author}: {text}"));
                }
            }
        }
    }

    // ========================================================================
    // DEVICES
    // ========================================================================

    /// Applies a key event to the local input.
    pub fn on_key(&mut self, code: KeyCode, pressed: bool) -> KeyOutcome {
        let outcome = apply_key(&mut self.local, code, pressed);
        if outcome == KeyOutcome::Changed {
            self.local_input_changed();
        }
        outcome
    }

    /// A controller was plugged in.
    pub fn on_controller_connected(&mut self, index: usize, name: &str) {
        if self.controllers.connected() {
            info!("Controller polling enabled");
        }
        self.record(format!("Gamepad connected: {name} (#{index})."));
    }

    /// A controller was unplugged. Its binding is released and the slot it
    /// fed goes idle.
    pub fn on_controller_disconnected(&mut self, index: usize, name: &str) {
        self.record(format!("Gamepad disconnected: {name} (#{index})."));
        match self.controllers.disconnected(index) {
            Some(Binding::Local) => {
                if self.local.replace(InputState::IDLE) {
                    self.local_input_changed();
                }
            }
            Some(Binding::Remote) => self.remote.clear(),
            None => {}
        }
    }

    /// Applies one controller poll.
    pub fn apply_controllers(&mut self, snapshots: &[ControllerSnapshot]) {
        let poll = self.controllers.poll(
            snapshots,
            &self.local,
            &self.remote,
            self.role == Role::Host,
        );
        for (index, binding) in poll.bound {
            let slot = match binding {
                Binding::Local => "local",
                Binding::Remote => "remote",
            };
            self.record(format!("Gamepad #{index} bound to the {slot} player."));
        }
        for (binding, state) in poll.updates {
            match binding {
                Binding::Local => {
                    if self.local.replace(state) {
                        self.local_input_changed();
                    }
                }
                Binding::Remote => {
                    self.remote.replace(state);
                }
            }
        }
    }

    /// True if the loop is running and a controller poll is due at `now`.
    pub fn controller_poll_due(&mut self, now: Instant) -> bool {
        self.simulation.is_running() && self.controllers.poll_due(now)
    }

    fn local_input_changed(&mut self) {
        if self.role == Role::Guest {
            self.send(&Message::Input { state: self.local });
        }
    }

    // ========================================================================
    // FRAME
    // ========================================================================

    /// Runs one frame at `now`. Host: integrate both slots and broadcast when
    /// due. Guest: nothing to simulate.
    pub fn tick(&mut self, now: Instant) {
        let Some(step) = self.simulation.advance(now) else {
            return;
        };
        if self.role != Role::Host {
            return;
        }

        step_players(
            &mut self.players,
            &self.local,
            &self.remote,
            step.as_secs_f32(),
            self.simulation.speed(),
            &self.arena,
        );

        if self.is_channel_open() && self.simulation.broadcast_due(step) {
            let snapshot = Message::State(StateSnapshot {
                players: self.players.clone(),
                timestamp: unix_millis(),
            });
            self.send(&snapshot);
        }
    }

    fn start_loop(&mut self) {
        self.simulation.start();
        self.controllers.reset_timer();
        debug!(role = %self.role, "Frame loop started");
    }

    fn remote_display_name(&self) -> String {
        if self.remote_name.is_empty() {
            match self.role {
                Role::Guest => String::from("Host"),
                Role::Host | Role::Idle => String::from("Guest"),
            }
        } else {
            self.remote_name.clone()
        }
    }
}
