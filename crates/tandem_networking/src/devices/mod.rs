//! # Input Devices
//!
//! Keyboard events and polled controllers, both reduced to the shared
//! [`InputState`](tandem_shared::InputState) model.

mod controller;
mod keyboard;

pub use controller::{
    Binding, ControllerHub, ControllerPoll, ControllerSnapshot, ControllerSource, NoControllers,
    VirtualControllers, BUTTON_DPAD_DOWN, BUTTON_DPAD_LEFT, BUTTON_DPAD_RIGHT, BUTTON_DPAD_UP,
};
pub use keyboard::{apply_key, KeyCode, KeyOutcome};
