//! Runtime root: builds every component from a configuration and a board
//! and starts the execution contexts.

use std::thread::JoinHandle;
use std::time::Duration;

use blinky_hal::{
    BitBangTransmitter, Button, ButtonLine, Led, LedControl, Level, Polarity, PulseTransmitter,
    SimPin,
};
use blinky_runtime::sync::Arc;
use blinky_runtime::{ActiveRunner, SpawnError, TimerService, WorkQueue};
use log::{error, info};

use crate::button::{ButtonFsm, ButtonState};
use crate::config::{BlinkyConfig, ConfigError};
use crate::led::{LedBlinker, LedObject, LED_QUEUE_DEPTH};

/// Queue depth of the deferred work queue.
pub const WORK_QUEUE_DEPTH: usize = 8;

const LED_STACK_SIZE: usize = 64 * 1024;

/// Hardware the application drives.
#[derive(Clone)]
pub struct Board {
    /// LED carrying the Morse patterns.
    pub primary_led: Arc<dyn LedControl>,
    /// LED blinking while the button is held.
    pub secondary_led: Arc<dyn LedControl>,
    pub button: Arc<dyn ButtonLine>,
    /// Pulse output on the primary LED.
    pub pulse: Arc<dyn PulseTransmitter>,
}

/// Simulated pins wired like the original board: green LED active high,
/// blue LED and button active low.
#[derive(Debug, Clone)]
pub struct SimBoard {
    pub green: SimPin,
    pub blue: SimPin,
    pub button: SimPin,
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            green: SimPin::named("green", Level::Low),
            blue: SimPin::named("blue", Level::High),
            button: SimPin::named("button", Level::High),
        }
    }

    /// Board over these pins; pulses bit-bang the green LED.
    pub fn board(&self, bit_time: Duration) -> Board {
        let green = Arc::new(Led::new(self.green.clone(), Polarity::ActiveHigh));
        Board {
            primary_led: Arc::clone(&green) as Arc<dyn LedControl>,
            secondary_led: Arc::new(Led::new(self.blue.clone(), Polarity::ActiveLow)),
            button: Arc::new(Button::new(self.button.clone(), Polarity::ActiveLow)),
            pulse: Arc::new(BitBangTransmitter::new(green, bit_time)),
        }
    }

    pub fn press(&self) {
        self.button.set(Level::Low);
    }

    pub fn release(&self) {
        self.button.set(Level::High);
    }

    pub fn green_on(&self) -> bool {
        self.green.level() == Level::High
    }

    pub fn blue_on(&self) -> bool {
        self.blue.level() == Level::Low
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

type BoardBlinker = LedBlinker<Arc<dyn LedControl>, Arc<dyn PulseTransmitter>>;

/// LED active object bound to its behavior, for hosts that step it.
pub type LedRunner = ActiveRunner<BoardBlinker, LED_QUEUE_DEPTH>;

/// The whole application.
pub struct Blinky {
    config: BlinkyConfig,
    timers: TimerService,
    work: WorkQueue<WORK_QUEUE_DEPTH>,
    button: Arc<ButtonFsm>,
    led: Option<(LedObject, BoardBlinker)>,
}

impl Blinky {
    /// Builds the application on the system clock.
    pub fn new(config: BlinkyConfig, board: Board) -> Result<Self, ConfigError> {
        Self::with_timers(config, board, TimerService::system())
    }

    /// Builds the application on an existing timer service.
    pub fn with_timers(
        config: BlinkyConfig,
        board: Board,
        timers: TimerService,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let led_object = LedObject::new("led").with_stack_size(LED_STACK_SIZE);
        let blinker = LedBlinker::new(
            &config,
            &timers,
            &led_object.handle(),
            board.primary_led,
            board.pulse,
        );
        let button = ButtonFsm::new(
            &timers,
            board.button,
            board.secondary_led,
            config.watchdog_period,
            config.blink_period,
        );
        button.start();

        Ok(Self {
            config,
            timers,
            work: WorkQueue::new(),
            button,
            led: Some((led_object, blinker)),
        })
    }

    /// Starts the timer service and the worker, then asks the worker to
    /// start the LED active object.
    pub fn start(&mut self) -> Result<Vec<JoinHandle<()>>, SpawnError> {
        let threads = vec![self.timers.spawn()?, self.work.spawn("work-queue")?];

        if let Some((object, blinker)) = self.led.take() {
            let queued = self.work.push_work(move || {
                if let Err(err) = object.spawn(blinker) {
                    error!("{err}");
                }
            });
            if let Err(err) = queued {
                error!("LED start dropped: {err}");
            }
        }
        info!("blinky started");
        Ok(threads)
    }

    /// Hands out the LED active object without starting a thread for it.
    /// Returns `None` once the object was taken or started.
    pub fn take_led_runner(&mut self) -> Option<LedRunner> {
        self.led
            .take()
            .map(|(object, blinker)| object.runner(blinker))
    }

    /// Interrupt entry point for a button press edge. Only queues work.
    pub fn on_button_edge(&self) {
        let button = Arc::clone(&self.button);
        if let Err(err) = self.work.push_work(move || button.handle_press()) {
            error!("button press dropped: {err}");
        }
    }

    /// Stops the timer service and the worker.
    pub fn shutdown(&self) {
        self.timers.shutdown();
        self.work.shutdown();
    }

    pub fn config(&self) -> &BlinkyConfig {
        &self.config
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn work(&self) -> &WorkQueue<WORK_QUEUE_DEPTH> {
        &self.work
    }

    pub fn button(&self) -> &ButtonFsm {
        &self.button
    }

    pub fn button_state(&self) -> Option<ButtonState> {
        self.button.state()
    }
}
