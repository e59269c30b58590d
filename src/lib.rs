//! Touch gesture recognition and navigation for Linux multitouch surfaces.
//!
//! The recognizer ([`gestures::GestureEngine`]) is pure and clock-driven; the
//! daemon in [`ipc`] wires it to evdev input and uinput output.

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod gestures;
pub mod input;
pub mod ipc;
pub mod logging;
pub mod replay;
pub mod sample;
pub mod sensitivity;
pub mod tracker;
