//! Canonical input model.
//!
//! Every capture source (keyboard, controllers, the network) reduces to the
//! same four booleans. Sources only set or clear fields, so two sources can
//! drive one `InputState` without coordination: last writer wins per field.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// One of the four movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward negative Y.
    Up,
    /// Toward positive Y.
    Down,
    /// Toward negative X.
    Left,
    /// Toward positive X.
    Right,
}

impl Direction {
    /// All directions, in field order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];
}

/// Four independent direction flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputState {
    /// Up is held.
    pub up: bool,
    /// Down is held.
    pub down: bool,
    /// Left is held.
    pub left: bool,
    /// Right is held.
    pub right: bool,
}

impl InputState {
    /// No direction held.
    pub const IDLE: Self = Self {
        up: false,
        down: false,
        left: false,
        right: false,
    };

    /// Creates an input state with nothing held.
    #[must_use]
    pub const fn new() -> Self {
        Self::IDLE
    }

    /// Returns whether `direction` is held.
    #[inline]
    #[must_use]
    pub const fn get(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    /// Sets `direction` and reports whether the value changed.
    ///
    /// Setting a field to the value it already holds is a no-op and returns
    /// `false`; key repeat relies on this to avoid re-broadcasting.
    pub fn set(&mut self, direction: Direction, pressed: bool) -> bool {
        let field = match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        };
        if *field == pressed {
            return false;
        }
        *field = pressed;
        true
    }

    /// Replaces the whole vector, reporting whether anything changed.
    pub fn replace(&mut self, next: Self) -> bool {
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    /// Releases every direction.
    pub fn clear(&mut self) {
        *self = Self::IDLE;
    }

    /// Returns true if no direction is held.
    #[inline]
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }

    /// Raw movement axis: `x = right - left`, `y = down - up`.
    ///
    /// Opposite directions cancel. The result is not normalized.
    #[must_use]
    pub fn axis(&self) -> Vec2 {
        let x = f32::from(u8::from(self.right)) - f32::from(u8::from(self.left));
        let y = f32::from(u8::from(self.down)) - f32::from(u8::from(self.up));
        Vec2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_changes_only() {
        let mut input = InputState::new();

        assert!(input.set(Direction::Right, true));
        assert!(!input.set(Direction::Right, true));
        assert!(input.right);

        assert!(input.set(Direction::Right, false));
        assert!(!input.set(Direction::Right, false));
        assert!(input.is_idle());
    }

    #[test]
    fn test_replace() {
        let mut input = InputState::new();
        let next = InputState { up: true, left: true, ..InputState::IDLE };

        assert!(input.replace(next));
        assert!(!input.replace(next));
        assert_eq!(input, next);
    }

    #[test]
    fn test_axis_cancels_opposites() {
        let input = InputState { up: true, down: true, right: true, left: false };
        assert_eq!(input.axis(), Vec2::new(1.0, 0.0));

        let diagonal = InputState { up: true, left: true, ..InputState::IDLE };
        assert_eq!(diagonal.axis(), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn test_get_matches_fields() {
        let input = InputState { down: true, ..InputState::IDLE };
        for direction in Direction::ALL {
            assert_eq!(input.get(direction), direction == Direction::Down);
        }
    }
}
