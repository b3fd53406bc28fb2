//! Player slots and the arena they move in.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ARENA_HEIGHT, ARENA_PADDING, ARENA_WIDTH, GUEST_COLOR, GUEST_SPAWN_FACTOR, HOST_COLOR,
    HOST_SPAWN_FACTOR, PLAYER_RADIUS,
};
use crate::math::Vec2;

/// One of the two named player positions.
///
/// A slot is independent of which process currently owns it: a guest
/// process mirrors both slots purely for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Driven by the host's local input.
    Host,
    /// Driven by the guest's input, as received by the host.
    Guest,
}

/// Rectangular play area. Positions stay within `padding` of every edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arena {
    /// Width in world units.
    pub width: f32,
    /// Height in world units.
    pub height: f32,
    /// Margin kept from each edge.
    pub padding: f32,
}

impl Arena {
    /// Creates an arena.
    #[must_use]
    pub const fn new(width: f32, height: f32, padding: f32) -> Self {
        Self { width, height, padding }
    }

    /// Smallest allowed position.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        Vec2::new(self.padding, self.padding)
    }

    /// Largest allowed position.
    #[inline]
    #[must_use]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.width - self.padding, self.height - self.padding)
    }

    /// Clamps a position into bounds, per axis.
    #[must_use]
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        position.clamp(self.min(), self.max())
    }

    /// Returns true if `position` lies within bounds.
    #[must_use]
    pub fn contains(&self, position: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        (min.x..=max.x).contains(&position.x) && (min.y..=max.y).contains(&position.y)
    }

    /// Spawn point for a slot.
    #[must_use]
    pub fn spawn_point(&self, slot: Slot) -> Vec2 {
        let factor = match slot {
            Slot::Host => HOST_SPAWN_FACTOR,
            Slot::Guest => GUEST_SPAWN_FACTOR,
        };
        Vec2::new(self.width * factor, self.height * 0.5)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ARENA_WIDTH, ARENA_HEIGHT, ARENA_PADDING)
    }
}

/// Network-visible state of one player slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Center position in arena space.
    pub position: Vec2,
    /// Fill color as a CSS hex string.
    pub color: String,
    /// Display name. Empty until known.
    pub name: String,
    /// Collision radius.
    pub radius: f32,
}

impl PlayerState {
    /// Default state of `slot` in `arena`.
    #[must_use]
    pub fn spawn(slot: Slot, arena: &Arena) -> Self {
        let color = match slot {
            Slot::Host => HOST_COLOR,
            Slot::Guest => GUEST_COLOR,
        };
        Self {
            position: arena.spawn_point(slot),
            color: color.to_owned(),
            name: String::new(),
            radius: PLAYER_RADIUS,
        }
    }
}

/// Both player slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Players {
    /// The host's slot.
    pub host: PlayerState,
    /// The guest's slot.
    pub guest: PlayerState,
}

impl Players {
    /// Both slots at their default positions.
    #[must_use]
    pub fn spawn(arena: &Arena) -> Self {
        Self {
            host: PlayerState::spawn(Slot::Host, arena),
            guest: PlayerState::spawn(Slot::Guest, arena),
        }
    }

    /// Returns a slot.
    #[must_use]
    pub const fn get(&self, slot: Slot) -> &PlayerState {
        match slot {
            Slot::Host => &self.host,
            Slot::Guest => &self.guest,
        }
    }

    /// Returns a slot mutably.
    pub fn get_mut(&mut self, slot: Slot) -> &mut PlayerState {
        match slot {
            Slot::Host => &mut self.host,
            Slot::Guest => &mut self.guest,
        }
    }

    /// Puts one slot back at its default state.
    pub fn reset_slot(&mut self, slot: Slot, arena: &Arena) {
        *self.get_mut(slot) = PlayerState::spawn(slot, arena);
    }

    /// Puts both slots back at their default state.
    pub fn reset(&mut self, arena: &Arena) {
        *self = Self::spawn(arena);
    }
}

impl Default for Players {
    fn default() -> Self {
        Self::spawn(&Arena::default())
    }
}
