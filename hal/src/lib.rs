//! Hardware abstraction layer for the blinky firmware
//!
//! The application only ever talks to three capabilities: an LED it can
//! switch, a button line it can sample and a pulse output that shifts a bit
//! pattern onto an LED. Board code implements the pin traits in [`gpio`];
//! the host uses [`sim::SimPin`] instead.

pub mod gpio;
pub mod pulse;
pub mod sim;

// Re-export commonly used types
pub use gpio::{Button, ButtonLine, InputPin, Led, LedControl, Level, OutputPin, Polarity};
pub use pulse::{BitBangTransmitter, PulseTransmitter, RecordingTransmitter, TRAILING_GAP_BITS};
pub use sim::SimPin;
