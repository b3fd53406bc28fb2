//! # TANDEM Shared
//!
//! Types both peers must agree on: the canonical input vector, the two
//! player slots and the wire message protocol.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on a transport, a runtime or a device API.
//! If you need any of those, put them in `tandem_networking`.

#![deny(unsafe_code)]

pub mod constants;
pub mod input;
pub mod math;
pub mod player;
pub mod protocol;

pub use constants::{ARENA_HEIGHT, ARENA_PADDING, ARENA_WIDTH, BROADCAST_HZ, MAX_LOG_ITEMS, PLAYER_SPEED};
pub use input::{Direction, InputState};
pub use math::Vec2;
pub use player::{Arena, PlayerState, Players, Slot};
pub use protocol::{Message, ProtocolError, ProtocolResult, StateSnapshot};
