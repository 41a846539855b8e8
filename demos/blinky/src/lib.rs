//! Blinky: an LED/button peripheral demo on the blinky runtime.
//!
//! - [`led`] sends two Morse patterns from an active object fed by timers.
//! - [`button`] tracks a press with a state machine and a sampling watchdog
//!   that blinks a second LED while the button is held.
//! - [`app`] wires both onto a board and starts the execution contexts.

pub mod app;
pub mod button;
pub mod config;
pub mod led;
pub mod logging;

pub use app::{Blinky, Board, LedRunner, SimBoard};
pub use button::{ButtonCoordinator, ButtonFsm, ButtonState, Edge};
pub use config::{BlinkyConfig, BlinkyConfigBuilder, ConfigError};
pub use led::{LedBlinker, LedEvent};
