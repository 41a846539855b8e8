//! LED active object: sends the two Morse patterns on independent periods.
//!
//! Both timers only post into the object's queue, so the primary LED is
//! driven exclusively from the LED thread and a pattern is never cut short
//! by the other one.

use std::time::Duration;

use blinky_hal::{LedControl, PulseTransmitter};
use blinky_runtime::{
    ActiveBehavior, ActiveEvent, ActiveHandle, ActiveObject, Dispatch, Timer, TimerService,
};
use log::debug;

use crate::config::BlinkyConfig;

/// Queue depth of the LED active object.
pub const LED_QUEUE_DEPTH: usize = 8;

/// Events of the LED active object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedEvent {
    Start,
    MorseA,
    MorseB,
}

impl ActiveEvent for LedEvent {
    const START: Self = LedEvent::Start;
}

pub type LedObject = ActiveObject<LedEvent, LED_QUEUE_DEPTH>;
pub type LedHandle = ActiveHandle<LedEvent, LED_QUEUE_DEPTH>;

/// Behavior of the LED active object.
pub struct LedBlinker<L, T> {
    led: L,
    pulse: T,
    morse_a: Timer,
    morse_b: Timer,
    morse_a_period: Duration,
    morse_b_period: Duration,
    morse_a_pattern: u32,
    morse_b_pattern: u32,
}

impl<L, T> LedBlinker<L, T>
where
    L: LedControl + 'static,
    T: PulseTransmitter + 'static,
{
    /// Creates the behavior; its timers post into `handle`.
    pub fn new(
        config: &BlinkyConfig,
        timers: &TimerService,
        handle: &LedHandle,
        led: L,
        pulse: T,
    ) -> Self {
        Self {
            led,
            pulse,
            morse_a: posting_timer(
                timers,
                "morse-a",
                handle.clone(),
                LedEvent::MorseA,
                config.morse_a_period,
            ),
            morse_b: posting_timer(
                timers,
                "morse-b",
                handle.clone(),
                LedEvent::MorseB,
                config.morse_b_period,
            ),
            morse_a_period: config.morse_a_period,
            morse_b_period: config.morse_b_period,
            morse_a_pattern: config.morse_a_pattern,
            morse_b_pattern: config.morse_b_pattern,
        }
    }

    pub fn morse_a_timer(&self) -> &Timer {
        &self.morse_a
    }

    pub fn morse_b_timer(&self) -> &Timer {
        &self.morse_b
    }
}

/// Timer that posts `event` every `period`, measured from each expected
/// deadline. A full queue loses that one event; the schedule goes on.
fn posting_timer(
    timers: &TimerService,
    name: &'static str,
    handle: LedHandle,
    event: LedEvent,
    period: Duration,
) -> Timer {
    timers.timer(name, move |expiry| {
        // The handle logs and counts the drop.
        let _ = handle.post(event);
        expiry.rearm_at(expiry.deadline() + period);
    })
}

impl<L, T> ActiveBehavior for LedBlinker<L, T>
where
    L: LedControl + 'static,
    T: PulseTransmitter + 'static,
{
    type Event = LedEvent;

    fn on_event(&mut self, event: LedEvent) -> Dispatch {
        match event {
            LedEvent::Start => {
                self.led.turn_off();
                self.morse_a.invoke_after(self.morse_a_period);
                self.morse_b.invoke_after(self.morse_b_period);
                debug!("morse timers armed");
            }
            LedEvent::MorseA => self.pulse.send_bit_pattern(self.morse_a_pattern),
            LedEvent::MorseB => self.pulse.send_bit_pattern(self.morse_b_pattern),
        }
        Dispatch::Handled
    }
}
