//! Keyboard capture.
//!
//! Keys are identified by physical position (W3C `KeyboardEvent.code`
//! strings such as `"KeyW"`), so the bindings survive non-QWERTY layouts.

use tandem_shared::{Direction, InputState};

/// Physical keys the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Arrow up.
    ArrowUp,
    /// Arrow down.
    ArrowDown,
    /// Arrow left.
    ArrowLeft,
    /// Arrow right.
    ArrowRight,
    /// The key in the W position.
    KeyW,
    /// The key in the A position.
    KeyA,
    /// The key in the S position.
    KeyS,
    /// The key in the D position.
    KeyD,
    /// Any key without a binding.
    Other,
}

impl KeyCode {
    /// Parses a W3C `code` string. Unknown codes map to [`KeyCode::Other`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "KeyW" => Self::KeyW,
            "KeyA" => Self::KeyA,
            "KeyS" => Self::KeyS,
            "KeyD" => Self::KeyD,
            _ => Self::Other,
        }
    }

    /// Direction bound to this key.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::ArrowUp | Self::KeyW => Some(Direction::Up),
            Self::ArrowDown | Self::KeyS => Some(Direction::Down),
            Self::ArrowLeft | Self::KeyA => Some(Direction::Left),
            Self::ArrowRight | Self::KeyD => Some(Direction::Right),
            Self::Other => None,
        }
    }
}

impl From<&str> for KeyCode {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

/// What a key event did to the local input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key has no binding. The host application keeps its default
    /// handling of it.
    Unbound,
    /// Bound, but the direction already had that value (key repeat).
    Unchanged,
    /// Bound and the direction flipped.
    Changed,
}

impl KeyOutcome {
    /// True if the host application should suppress its default handling.
    #[must_use]
    pub const fn is_bound(self) -> bool {
        !matches!(self, Self::Unbound)
    }
}

/// Applies one key event to `input`.
pub fn apply_key(input: &mut InputState, code: KeyCode, pressed: bool) -> KeyOutcome {
    match code.direction() {
        None => KeyOutcome::Unbound,
        Some(direction) if input.set(direction, pressed) => KeyOutcome::Changed,
        Some(_) => KeyOutcome::Unchanged,
    }
}
