//! Pulse output: shifting a bit pattern onto an LED.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::trace;
use parking_lot::Mutex;

use crate::gpio::LedControl;

/// Bit times the line stays off after a pattern.
pub const TRAILING_GAP_BITS: u32 = 7;

/// Sends a 32-bit pattern as timed on/off pulses.
pub trait PulseTransmitter: Send + Sync {
    /// Shifts `pattern` out most significant bit first, one bit time per
    /// bit, stopping after the last set bit; then holds the line off for
    /// [`TRAILING_GAP_BITS`] bit times. Blocks for the whole sequence.
    fn send_bit_pattern(&self, pattern: u32);
}

/// Transmitter that busy-drives an LED with a fixed bit time.
#[derive(Debug)]
pub struct BitBangTransmitter<L> {
    led: L,
    bit_time: Duration,
}

impl<L: LedControl> BitBangTransmitter<L> {
    pub fn new(led: L, bit_time: Duration) -> Self {
        Self { led, bit_time }
    }

    pub fn bit_time(&self) -> Duration {
        self.bit_time
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    fn hold(&self, bits: u32) {
        if !self.bit_time.is_zero() {
            thread::sleep(self.bit_time * bits);
        }
    }
}

impl<L: LedControl> PulseTransmitter for BitBangTransmitter<L> {
    fn send_bit_pattern(&self, pattern: u32) {
        trace!("pulse pattern {pattern:#010x}");
        let mut bits = pattern;
        while bits != 0 {
            if bits & (1 << 31) != 0 {
                self.led.turn_on();
            } else {
                self.led.turn_off();
            }
            self.hold(1);
            bits <<= 1;
        }
        self.led.turn_off();
        self.hold(TRAILING_GAP_BITS);
    }
}

/// Transmitter that only records what it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransmitter {
    sent: Arc<Mutex<Vec<u32>>>,
}

impl RecordingTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<u32> {
        self.sent.lock().clone()
    }

    pub fn take_sent(&self) -> Vec<u32> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl PulseTransmitter for RecordingTransmitter {
    fn send_bit_pattern(&self, pattern: u32) {
        self.sent.lock().push(pattern);
    }
}

impl<T: PulseTransmitter + ?Sized> PulseTransmitter for Arc<T> {
    fn send_bit_pattern(&self, pattern: u32) {
        (**self).send_bit_pattern(pattern)
    }
}
