//! Render boundary.
//!
//! Drawing is a pure function of session state. The engine builds a
//! [`Scene`] after every frame and hands it to whatever [`RenderSink`] the
//! application installed.

use tandem_shared::{Arena, Players};

use crate::session::Role;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    /// Play area.
    pub arena: &'a Arena,
    /// Both player slots.
    pub players: &'a Players,
    /// Caption for the host slot.
    pub host_label: &'a str,
    /// Caption for the guest slot.
    pub guest_label: &'a str,
    /// `offline`, `host` or `guest`.
    pub mode: &'static str,
}

/// Draws scenes.
pub trait RenderSink: Send {
    /// Draws one frame.
    fn draw(&mut self, scene: &Scene<'_>);
}

/// Slot captions for `role`: `(host_label, guest_label)`.
///
/// On a guest the local player sits in the guest slot and unknown names fall
/// back to "Host" / "You"; everywhere else the local player is the host.
#[must_use]
pub fn slot_labels<'a>(role: Role, local_name: &'a str, remote_name: &'a str) -> (&'a str, &'a str) {
    match role {
        Role::Guest => (or(remote_name, "Host"), or(local_name, "You")),
        Role::Host | Role::Idle => (or(local_name, "Host"), or(remote_name, "Guest")),
    }
}

fn or<'a>(name: &'a str, fallback: &'a str) -> &'a str {
    if name.is_empty() {
        fallback
    } else {
        name
    }
}

/// Mode caption for `role`.
#[must_use]
pub const fn mode_text(role: Role) -> &'static str {
    match role {
        Role::Idle => "offline",
        Role::Host => "host",
        Role::Guest => "guest",
    }
}
