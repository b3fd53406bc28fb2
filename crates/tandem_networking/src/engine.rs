//! # Engine
//!
//! Single-threaded actor around one [`Session`].
//!
//! ```text
//!   EventSink (clone freely) ──► crossbeam queue ──► Engine::pump
//!                                                      │
//!                                 ┌────────────────────┼────────────────────┐
//!                                 ▼                    ▼                    ▼
//!                             Session            ControllerSource      RenderSink
//!                        (state machine)       (polled on ticks)    (after every tick)
//! ```
//!
//! Every event runs to completion before the next is taken, so handlers
//! never observe a half-applied transition. The engine itself never blocks:
//! the application decides when to call [`Engine::pump`] and how often to
//! post [`EngineEvent::Tick`].

use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::devices::{ControllerSource, KeyCode, KeyOutcome, NoControllers};
use crate::error::{ConfigResult, SessionResult};
use crate::events::{Command, EngineEvent, EventSink};
use crate::render::RenderSink;
use crate::session::Session;
use crate::transport::Discovery;

/// The session actor.
pub struct Engine {
    config: EngineConfig,
    session: Session,
    discovery: Box<dyn Discovery>,
    controllers: Box<dyn ControllerSource>,
    renderer: Option<Box<dyn RenderSink>>,
    sender: EventSink,
    receiver: Receiver<EngineEvent>,
}

impl Engine {
    /// Creates an idle engine without controllers or renderer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`](crate::ConfigError::Invalid) if
    /// `config` fails [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, discovery: Box<dyn Discovery>) -> ConfigResult<Self> {
        config.validate()?;
        let (sender, receiver) = unbounded();
        let session = Session::new(&config);
        info!(
            signaling = %config.signaling.resolve().describe(),
            transport = %discovery.describe(),
            "Engine created"
        );
        Ok(Self {
            config,
            session,
            discovery,
            controllers: Box::new(NoControllers),
            renderer: None,
            sender,
            receiver,
        })
    }

    /// Installs a controller source. Controllers already present enable
    /// polling right away.
    #[must_use]
    pub fn with_controllers(mut self, mut source: Box<dyn ControllerSource>) -> Self {
        for pad in source.snapshot().into_iter().filter(|pad| pad.connected) {
            self.session.on_controller_connected(pad.index, &pad.id);
        }
        self.controllers = source;
        self
    }

    /// Installs a renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn RenderSink>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Handle for posting events from anywhere.
    #[must_use]
    pub fn sink(&self) -> EventSink {
        self.sender.clone()
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of events waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Handles queued events until the queue is empty, including events
    /// posted while handling. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Handles one event to completion.
    pub fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Tick(now) => self.tick(now),
            EngineEvent::Peer { peer, event } => self.session.on_peer_event(peer, event),
            EngineEvent::Channel { channel, event } => {
                self.session.on_channel_event(channel, event);
            }
            EngineEvent::Key { code, pressed } => {
                self.key(code, pressed);
            }
            EngineEvent::ControllerConnected { index, name } => {
                self.session.on_controller_connected(index, &name);
            }
            EngineEvent::ControllerDisconnected { index, name } => {
                self.session.on_controller_disconnected(index, &name);
            }
            EngineEvent::Command(command) => self.command(command),
        }
    }

    fn command(&mut self, command: Command) {
        let result = match command {
            Command::CreateRoom { name } => self.create_room(&name),
            Command::JoinRoom { name, room } => self.join_room(&name, &room),
            Command::SendChat(text) => self.send_chat(&text),
            Command::Leave => {
                self.leave();
                Ok(())
            }
        };
        // Failures are already on the status line and in the log.
        if let Err(err) = result {
            debug!(error = %err, "Command rejected");
        }
    }

    // ========================================================================
    // DIRECT API
    // ========================================================================

    /// Becomes host of a new room.
    ///
    /// # Errors
    ///
    /// See [`Session::create_room`].
    pub fn create_room(&mut self, name: &str) -> SessionResult<()> {
        let sink = self.sender.clone();
        self.session.create_room(name, self.discovery.as_mut(), sink)
    }

    /// Joins a room as guest.
    ///
    /// # Errors
    ///
    /// See [`Session::join_room`].
    pub fn join_room(&mut self, name: &str, room: &str) -> SessionResult<()> {
        let sink = self.sender.clone();
        self.session.join_room(name, room, self.discovery.as_mut(), sink)
    }

    /// Sends a chat line.
    ///
    /// # Errors
    ///
    /// See [`Session::send_chat`].
    pub fn send_chat(&mut self, text: &str) -> SessionResult<()> {
        self.session.send_chat(text)
    }

    /// Leaves the room. Returns false if already idle.
    pub fn leave(&mut self) -> bool {
        self.session.leave()
    }

    /// Applies a key event.
    pub fn key(&mut self, code: KeyCode, pressed: bool) -> KeyOutcome {
        self.session.on_key(code, pressed)
    }

    /// Runs one frame: controller poll if due, simulation step, render.
    pub fn tick(&mut self, now: Instant) {
        if self.session.controller_poll_due(now) {
            let snapshots = self.controllers.snapshot();
            self.session.apply_controllers(&snapshots);
        }
        self.session.tick(now);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.draw(&self.session.scene());
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.session.leave() {
            debug!("Engine dropped with an active session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::transport::LoopbackNetwork;

    #[test]
    fn test_new_rejects_padding_that_fills_the_arena() {
        let network = LoopbackNetwork::new();
        let mut config = EngineConfig::default();
        config.arena.padding = config.arena.width;

        let err = Engine::new(config, Box::new(network.clone())).err();
        assert!(matches!(err, Some(ConfigError::Invalid(_))));
        // Nothing was registered on the network.
        assert!(network.rooms().is_empty());
    }

    #[test]
    fn test_new_rejects_zero_speed() {
        let mut config = EngineConfig::default();
        config.simulation.speed = 0.0;

        assert!(Engine::new(config, Box::new(LoopbackNetwork::new())).is_err());
    }

    #[test]
    fn test_valid_config_moves_inside_bounds() {
        let mut config = EngineConfig::default();
        config.arena.padding = config.arena.width.min(config.arena.height) / 2.0 - 1.0;
        let mut engine = Engine::new(config.clone(), Box::new(LoopbackNetwork::new())).unwrap();
        let t0 = Instant::now();

        engine.create_room("Ana").unwrap();
        engine.pump();
        engine.key(KeyCode::KeyD, true);
        engine.tick(t0);
        engine.tick(t0 + std::time::Duration::from_millis(100));

        assert!(config.arena.contains(engine.session().players().host.position));
    }
}
