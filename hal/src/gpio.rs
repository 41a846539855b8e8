//! GPIO (General Purpose Input/Output) abstraction

use parking_lot::Mutex;

/// GPIO pin levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Low level (0V)
    Low,
    /// High level (VCC)
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Which level means "active" on a line.
///
/// An LED wired between the pin and VCC lights on a low level, a button
/// with a pull-up reads low while pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Level that drives the line active (`true`) or inactive.
    pub fn level_for(self, active: bool) -> Level {
        match self {
            Polarity::ActiveHigh => Level::from(active),
            Polarity::ActiveLow => Level::from(!active),
        }
    }

    pub fn is_active(self, level: Level) -> bool {
        level == self.level_for(true)
    }
}

/// Output pin driven by exactly one owner.
pub trait OutputPin: Send {
    /// Write level
    fn write(&mut self, level: Level);

    /// Level currently driven
    fn output_level(&self) -> Level;

    /// Toggle output
    fn toggle(&mut self) {
        let level = self.output_level().toggled();
        self.write(level);
    }
}

/// Input pin that can be sampled from any context.
pub trait InputPin: Send + Sync {
    /// Read current level
    fn read(&self) -> Level;
}

/// A switchable LED.
///
/// Every method is safe to call from any context; each LED should still be
/// driven from one context only, so that toggles never interleave with the
/// pulse pattern of another owner.
pub trait LedControl: Send + Sync {
    fn turn_on(&self);
    fn turn_off(&self);
    fn toggle(&self);
    fn is_on(&self) -> bool;
}

/// A push button line.
pub trait ButtonLine: Send + Sync {
    /// Current, undebounced state of the line.
    fn is_pressed(&self) -> bool;
}

/// LED on an output pin.
#[derive(Debug)]
pub struct Led<P> {
    pin: Mutex<P>,
    polarity: Polarity,
}

impl<P: OutputPin> Led<P> {
    /// Wraps `pin` and switches the LED off.
    pub fn new(mut pin: P, polarity: Polarity) -> Self {
        pin.write(polarity.level_for(false));
        Self {
            pin: Mutex::new(pin),
            polarity,
        }
    }
}

impl<P: OutputPin> LedControl for Led<P> {
    fn turn_on(&self) {
        self.pin.lock().write(self.polarity.level_for(true));
    }

    fn turn_off(&self) {
        self.pin.lock().write(self.polarity.level_for(false));
    }

    fn toggle(&self) {
        self.pin.lock().toggle();
    }

    fn is_on(&self) -> bool {
        self.polarity.is_active(self.pin.lock().output_level())
    }
}

/// Button on an input pin.
#[derive(Debug)]
pub struct Button<P> {
    pin: P,
    polarity: Polarity,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }
}

impl<P: InputPin> ButtonLine for Button<P> {
    fn is_pressed(&self) -> bool {
        self.polarity.is_active(self.pin.read())
    }
}

impl<T: LedControl + ?Sized> LedControl for std::sync::Arc<T> {
    fn turn_on(&self) {
        (**self).turn_on()
    }

    fn turn_off(&self) {
        (**self).turn_off()
    }

    fn toggle(&self) {
        (**self).toggle()
    }

    fn is_on(&self) -> bool {
        (**self).is_on()
    }
}

impl<T: ButtonLine + ?Sized> ButtonLine for std::sync::Arc<T> {
    fn is_pressed(&self) -> bool {
        (**self).is_pressed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPin;

    #[test]
    fn active_low_led_drives_inverted_levels() {
        let pin = SimPin::new(Level::High);
        let led = Led::new(pin.clone(), Polarity::ActiveLow);
        assert!(!led.is_on());
        assert_eq!(pin.level(), Level::High);

        led.turn_on();
        assert_eq!(pin.level(), Level::Low);
        assert!(led.is_on());

        led.toggle();
        assert!(!led.is_on());
        assert_eq!(pin.level(), Level::High);
    }

    #[test]
    fn button_reports_pressed_by_polarity() {
        let pin = SimPin::new(Level::High);
        let button = Button::new(pin.clone(), Polarity::ActiveLow);
        assert!(!button.is_pressed());

        pin.set(Level::Low);
        assert!(button.is_pressed());
    }
}
