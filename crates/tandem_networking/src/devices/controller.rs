//! # Controller Capture
//!
//! Controllers are sampled, not event-driven: the session asks a
//! [`ControllerSource`] for snapshots at a fixed cadence and reduces each
//! bound controller to an [`InputState`].
//!
//! ## Binding
//!
//! ```text
//! first connected controller ─────────────► local slot
//! next distinct controller (host only) ───► remote slot (couch co-op)
//! ```
//!
//! A binding holds until that controller is unplugged. Nothing is polled
//! until the platform has reported at least one connection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tandem_shared::InputState;

/// Standard-mapping d-pad up button.
pub const BUTTON_DPAD_UP: usize = 12;
/// Standard-mapping d-pad down button.
pub const BUTTON_DPAD_DOWN: usize = 13;
/// Standard-mapping d-pad left button.
pub const BUTTON_DPAD_LEFT: usize = 14;
/// Standard-mapping d-pad right button.
pub const BUTTON_DPAD_RIGHT: usize = 15;

/// Point-in-time state of one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    /// Platform slot index.
    pub index: usize,
    /// Platform description.
    pub id: String,
    /// False for a slot whose controller went away.
    pub connected: bool,
    /// Axis values in `[-1, 1]`. Axis 0 is horizontal, axis 1 vertical.
    pub axes: Vec<f32>,
    /// Pressed flags, standard mapping.
    pub buttons: Vec<bool>,
}

impl ControllerSnapshot {
    /// A connected controller at rest.
    #[must_use]
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            connected: true,
            axes: vec![0.0; 4],
            buttons: vec![false; 17],
        }
    }

    /// Axis value, zero if the controller has no such axis.
    #[inline]
    #[must_use]
    pub fn axis(&self, axis: usize) -> f32 {
        self.axes.get(axis).copied().unwrap_or(0.0)
    }

    /// Button state, released if the controller has no such button.
    #[inline]
    #[must_use]
    pub fn button(&self, button: usize) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }

    /// Reduces the stick and d-pad to an input vector.
    ///
    /// A direction is held if the stick is past `dead_zone` that way or the
    /// matching d-pad button is down.
    #[must_use]
    pub fn to_input(&self, dead_zone: f32) -> InputState {
        let (x, y) = (self.axis(0), self.axis(1));
        InputState {
            up: y < -dead_zone || self.button(BUTTON_DPAD_UP),
            down: y > dead_zone || self.button(BUTTON_DPAD_DOWN),
            left: x < -dead_zone || self.button(BUTTON_DPAD_LEFT),
            right: x > dead_zone || self.button(BUTTON_DPAD_RIGHT),
        }
    }
}

/// Platform controller API.
pub trait ControllerSource: Send {
    /// Current state of every controller slot.
    fn snapshot(&mut self) -> Vec<ControllerSnapshot>;
}

/// Source for platforms without controller support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoControllers;

impl ControllerSource for NoControllers {
    fn snapshot(&mut self) -> Vec<ControllerSnapshot> {
        Vec::new()
    }
}

/// Controllers driven from code. Clones share state, so a test or the demo
/// can keep one handle and give another to the engine.
#[derive(Debug, Clone, Default)]
pub struct VirtualControllers {
    pads: Arc<Mutex<BTreeMap<usize, ControllerSnapshot>>>,
}

impl VirtualControllers {
    /// Creates a source with no controllers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugs in (or replaces) a controller.
    pub fn plug(&self, snapshot: ControllerSnapshot) {
        self.pads.lock().insert(snapshot.index, snapshot);
    }

    /// Unplugs a controller.
    pub fn unplug(&self, index: usize) {
        self.pads.lock().remove(&index);
    }

    /// Moves a controller's stick.
    pub fn set_stick(&self, index: usize, x: f32, y: f32) {
        if let Some(pad) = self.pads.lock().get_mut(&index) {
            if pad.axes.len() < 2 {
                pad.axes.resize(2, 0.0);
            }
            pad.axes[0] = x;
            pad.axes[1] = y;
        }
    }

    /// Presses or releases a button.
    pub fn set_button(&self, index: usize, button: usize, pressed: bool) {
        if let Some(pad) = self.pads.lock().get_mut(&index) {
            if pad.buttons.len() <= button {
                pad.buttons.resize(button + 1, false);
            }
            pad.buttons[button] = pressed;
        }
    }
}

impl ControllerSource for VirtualControllers {
    fn snapshot(&mut self) -> Vec<ControllerSnapshot> {
        self.pads.lock().values().cloned().collect()
    }
}

/// Which input slot a controller feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// The local player.
    Local,
    /// The second local player on the host.
    Remote,
}

/// Result of one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerPoll {
    /// Readings that differ from the slot their controller feeds.
    pub updates: Vec<(Binding, InputState)>,
    /// Controllers bound during this poll.
    pub bound: Vec<(usize, Binding)>,
}

/// Binding table plus poll cadence.
#[derive(Debug, Clone)]
pub struct ControllerHub {
    enabled: bool,
    dead_zone: f32,
    poll_interval: Duration,
    last_poll: Option<Instant>,
    local: Option<usize>,
    remote: Option<usize>,
}

impl ControllerHub {
    /// Creates a disabled hub.
    #[must_use]
    pub const fn new(dead_zone: f32, poll_interval: Duration) -> Self {
        Self {
            enabled: false,
            dead_zone,
            poll_interval,
            last_poll: None,
            local: None,
            remote: None,
        }
    }

    /// True once any controller has connected.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Controller bound to the local slot.
    #[must_use]
    pub const fn local(&self) -> Option<usize> {
        self.local
    }

    /// Controller bound to the remote slot.
    #[must_use]
    pub const fn remote(&self) -> Option<usize> {
        self.remote
    }

    /// Records a connection. Returns true if this enabled polling.
    pub fn connected(&mut self) -> bool {
        !std::mem::replace(&mut self.enabled, true)
    }

    /// Records a disconnection and releases whatever `index` was bound to.
    pub fn disconnected(&mut self, index: usize) -> Option<Binding> {
        if self.local == Some(index) {
            self.local = None;
            Some(Binding::Local)
        } else if self.remote == Some(index) {
            self.remote = None;
            Some(Binding::Remote)
        } else {
            None
        }
    }

    /// Returns true (and restarts the interval) if a poll is due at `now`.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        let due = self
            .last_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= self.poll_interval);
        if due {
            self.last_poll = Some(now);
        }
        due
    }

    /// Restarts the poll interval, e.g. when the frame loop restarts.
    pub fn reset_timer(&mut self) {
        self.last_poll = None;
    }

    /// Binds unbound controllers and reads every bound one.
    ///
    /// The full vector is recomputed each poll and reported only when it
    /// differs from the slot it feeds (`local` / `remote` as they stand
    /// now). `allow_remote` is true only on the host; a guest never binds
    /// or reads a second controller.
    pub fn poll(
        &mut self,
        snapshots: &[ControllerSnapshot],
        local: &InputState,
        remote: &InputState,
        allow_remote: bool,
    ) -> ControllerPoll {
        let mut result = ControllerPoll::default();
        if !self.enabled {
            return result;
        }

        for pad in snapshots.iter().filter(|pad| pad.connected) {
            if self.local.is_none() {
                // A remote-bound controller is promoted rather than shared.
                if self.remote == Some(pad.index) {
                    self.remote = None;
                }
                self.local = Some(pad.index);
                result.bound.push((pad.index, Binding::Local));
            } else if allow_remote && self.remote.is_none() && self.local != Some(pad.index) {
                self.remote = Some(pad.index);
                result.bound.push((pad.index, Binding::Remote));
            }

            let input = pad.to_input(self.dead_zone);
            if self.local == Some(pad.index) {
                if input != *local {
                    result.updates.push((Binding::Local, input));
                }
            } else if allow_remote && self.remote == Some(pad.index) && input != *remote {
                result.updates.push((Binding::Remote, input));
            }
        }
        result
    }
}
