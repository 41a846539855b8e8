//! Simulated pins for running the firmware on a host.

use core::fmt;
use std::sync::Arc;

use heapless::HistoryBuffer;
use log::trace;
use parking_lot::Mutex;

use crate::gpio::{InputPin, Level, OutputPin};

/// Number of most recent writes a [`SimPin`] keeps.
pub const WRITE_HISTORY: usize = 256;

struct PinState {
    level: Level,
    writes: HistoryBuffer<Level, WRITE_HISTORY>,
    write_count: u64,
}

impl fmt::Debug for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinState")
            .field("level", &self.level)
            .field("retained_writes", &self.writes.len())
            .field("write_count", &self.write_count)
            .finish()
    }
}

/// A pin whose level lives in memory.
///
/// Clones share the same line: the firmware drives one clone while a test
/// or a host loop observes (or, for inputs, drives) another.
#[derive(Debug, Clone)]
pub struct SimPin {
    name: &'static str,
    state: Arc<Mutex<PinState>>,
}

impl SimPin {
    pub fn new(level: Level) -> Self {
        Self::named("sim", level)
    }

    pub fn named(name: &'static str, level: Level) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(PinState {
                level,
                writes: HistoryBuffer::new(),
                write_count: 0,
            })),
        }
    }

    /// Drives the line from outside, as a button or a test would.
    pub fn set(&self, level: Level) {
        self.state.lock().level = level;
    }

    pub fn level(&self) -> Level {
        self.state.lock().level
    }

    /// The last [`WRITE_HISTORY`] levels written through
    /// [`OutputPin::write`], oldest first.
    pub fn writes(&self) -> Vec<Level> {
        self.state.lock().writes.oldest_ordered().copied().collect()
    }

    /// Returns the retained writes and clears the record.
    pub fn take_writes(&self) -> Vec<Level> {
        let mut state = self.state.lock();
        let writes = state.writes.oldest_ordered().copied().collect();
        state.writes.clear();
        writes
    }

    /// Total number of writes since the pin was created, retained or not.
    pub fn write_count(&self) -> u64 {
        self.state.lock().write_count
    }
}

impl OutputPin for SimPin {
    fn write(&mut self, level: Level) {
        trace!("pin {} <- {level:?}", self.name);
        let mut state = self.state.lock();
        state.level = level;
        state.writes.write(level);
        state.write_count += 1;
    }

    fn output_level(&self) -> Level {
        self.level()
    }
}

impl InputPin for SimPin {
    fn read(&self) -> Level {
        self.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_line() {
        let mut driver = SimPin::new(Level::Low);
        let observer = driver.clone();

        driver.write(Level::High);
        driver.toggle();
        assert_eq!(observer.level(), Level::Low);
        assert_eq!(observer.take_writes(), vec![Level::High, Level::Low]);
        assert!(observer.writes().is_empty());

        observer.set(Level::High);
        assert_eq!(driver.read(), Level::High);
    }

    #[test]
    fn history_keeps_only_the_latest_writes() {
        let mut pin = SimPin::new(Level::Low);
        for _ in 0..WRITE_HISTORY * 4 + 1 {
            pin.toggle();
        }

        let writes = pin.writes();
        assert_eq!(writes.len(), WRITE_HISTORY);
        assert_eq!(writes.last(), Some(&Level::High));
        assert_eq!(writes[writes.len() - 2], Level::Low);
        assert_eq!(pin.write_count(), (WRITE_HISTORY * 4 + 1) as u64);

        assert_eq!(pin.take_writes().len(), WRITE_HISTORY);
        assert!(pin.writes().is_empty());
        assert_eq!(pin.write_count(), (WRITE_HISTORY * 4 + 1) as u64);
    }
}
