//! Button state machine and its debounce coordinator.
//!
//! A press arrives as an edge from the interrupt path and is handled on the
//! worker. From then on the coordinator samples the line on a watchdog
//! timer: the first sample that sees the button held starts the secondary
//! LED blinking, the first sample that sees it released drives the state
//! machine back to idle, which stops both timers and the LED.

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use blinky_hal::{ButtonLine, LedControl};
use blinky_runtime::sync::{Arc, Mutex, Weak};
use blinky_runtime::{Expiry, StateId, StateMachine, StateTable, Timer, TimerService};
use log::{debug, trace};

/// States of the button machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    ButtonPressed,
}

/// Data shared by the button states.
#[derive(Debug, Default)]
pub struct ButtonData {
    pub button_pressed: bool,
}

static IDLE: StateTable<ButtonState> = StateTable {
    on_press: |machine| {
        machine.data_mut().button_pressed = true;
        machine.set_state(Some(ButtonState::ButtonPressed));
    },
    ..StateTable::passive("Idle")
};

static BUTTON_PRESSED: StateTable<ButtonState> = StateTable {
    on_release: |machine| {
        machine.data_mut().button_pressed = false;
        machine.set_state(Some(ButtonState::Idle));
    },
    ..StateTable::passive("ButtonPressed")
};

impl StateId for ButtonState {
    type Data = ButtonData;

    fn table(self) -> &'static StateTable<Self> {
        match self {
            ButtonState::Idle => &IDLE,
            ButtonState::ButtonPressed => &BUTTON_PRESSED,
        }
    }
}

/// Level change seen by the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

struct Inner {
    line: Arc<dyn ButtonLine>,
    led: Arc<dyn LedControl>,
    watchdog_period: Duration,
    blink_period: Duration,
    last_observed_pressed: AtomicBool,
    watchdog_enabled: AtomicBool,
    watchdog: Timer,
    blink: Timer,
    on_release: Box<dyn Fn() + Send + Sync>,
}

impl Inner {
    fn sample(&self, pressed: bool) -> Option<Edge> {
        let was_pressed = self.last_observed_pressed.load(Ordering::Acquire);
        match (pressed, was_pressed) {
            (true, false) => {
                self.last_observed_pressed.store(true, Ordering::Release);
                self.blink.invoke_after(self.blink_period);
                Some(Edge::Pressed)
            }
            (false, true) => {
                self.last_observed_pressed.store(false, Ordering::Release);
                Some(Edge::Released)
            }
            _ => None,
        }
    }

    fn watchdog_tick(&self, expiry: &Expiry<'_>) {
        if !self.watchdog_enabled.load(Ordering::Acquire) {
            return;
        }
        if self.sample(self.line.is_pressed()) == Some(Edge::Released) {
            debug!("button released");
            (self.on_release)();
            return;
        }
        if self.watchdog_enabled.load(Ordering::Acquire) {
            expiry.rearm_at(expiry.deadline() + self.watchdog_period);
        }
    }

    fn blink_tick(&self, expiry: &Expiry<'_>) {
        if !self.watchdog_enabled.load(Ordering::Acquire) {
            return;
        }
        self.led.toggle();
        expiry.rearm_at(expiry.deadline() + self.blink_period);
    }

    fn start_watchdog(&self) {
        self.last_observed_pressed.store(false, Ordering::Release);
        self.watchdog_enabled.store(true, Ordering::Release);
        self.watchdog.invoke_after(self.watchdog_period);
        trace!("button watchdog started");
    }

    fn stop_watchdog(&self) {
        self.watchdog_enabled.store(false, Ordering::Release);
        self.watchdog.cancel();
        self.blink.cancel();
        self.led.turn_off();
        trace!("button watchdog stopped");
    }
}

/// Samples the button while a press is tracked and blinks the secondary
/// LED while it is held.
///
/// The blink timer is armed only while the watchdog is enabled and the last
/// sample saw the button pressed. Both timer callbacks run on the timer
/// service and touch the secondary LED directly; nothing else drives it.
#[derive(Clone)]
pub struct ButtonCoordinator {
    inner: Arc<Inner>,
}

impl ButtonCoordinator {
    /// Creates a stopped coordinator. `on_release` runs on the timer
    /// service when a tracked press ends.
    pub fn new<F>(
        timers: &TimerService,
        line: Arc<dyn ButtonLine>,
        led: Arc<dyn LedControl>,
        watchdog_period: Duration,
        blink_period: Duration,
        on_release: F,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|this: &Weak<Inner>| {
            let watchdog = {
                let this = this.clone();
                timers.timer("button-watchdog", move |expiry| {
                    if let Some(inner) = this.upgrade() {
                        inner.watchdog_tick(expiry);
                    }
                })
            };
            let blink = {
                let this = this.clone();
                timers.timer("blink", move |expiry| {
                    if let Some(inner) = this.upgrade() {
                        inner.blink_tick(expiry);
                    }
                })
            };
            Inner {
                line,
                led,
                watchdog_period,
                blink_period,
                last_observed_pressed: AtomicBool::new(false),
                watchdog_enabled: AtomicBool::new(false),
                watchdog,
                blink,
                on_release: Box::new(on_release),
            }
        });
        Self { inner }
    }

    /// Starts sampling the button from a fresh, unpressed observation.
    pub fn start_watchdog(&self) {
        self.inner.start_watchdog();
    }

    /// Stops sampling and blinking and switches the LED off. Idempotent.
    pub fn stop_watchdog(&self) {
        self.inner.stop_watchdog();
    }

    /// Feeds one sample of the line. A press arms the blink timer; a
    /// release only reports the edge.
    pub fn sample(&self, pressed: bool) -> Option<Edge> {
        self.inner.sample(pressed)
    }

    /// Applies the timer side effects of a state change.
    pub fn on_transition(&self, previous: Option<ButtonState>, current: Option<ButtonState>) {
        match (previous, current) {
            (_, Some(ButtonState::ButtonPressed)) => self.start_watchdog(),
            (Some(ButtonState::ButtonPressed), _) => self.stop_watchdog(),
            _ => {}
        }
    }

    pub fn is_watchdog_enabled(&self) -> bool {
        self.inner.watchdog_enabled.load(Ordering::Acquire)
    }

    pub fn last_observed_pressed(&self) -> bool {
        self.inner.last_observed_pressed.load(Ordering::Acquire)
    }

    pub fn watchdog_timer(&self) -> &Timer {
        &self.inner.watchdog
    }

    pub fn blink_timer(&self) -> &Timer {
        &self.inner.blink
    }
}

/// The button state machine, its lock and its coordinator.
///
/// The machine mutex is the only lock held across a transition. The
/// coordinator reached from the listener uses atomics and timer handles,
/// so no other lock is ever taken inside it.
pub struct ButtonFsm {
    machine: Mutex<StateMachine<ButtonState>>,
    coordinator: ButtonCoordinator,
}

impl ButtonFsm {
    pub fn new(
        timers: &TimerService,
        line: Arc<dyn ButtonLine>,
        led: Arc<dyn LedControl>,
        watchdog_period: Duration,
        blink_period: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let release = this.clone();
            let coordinator = ButtonCoordinator::new(
                timers,
                line,
                led,
                watchdog_period,
                blink_period,
                move || {
                    if let Some(fsm) = release.upgrade() {
                        fsm.handle_release();
                    }
                },
            );
            let listener = coordinator.clone();
            let machine = StateMachine::new(
                ButtonData::default(),
                move |previous: Option<ButtonState>, current: Option<ButtonState>| {
                    listener.on_transition(previous, current);
                },
            );
            Self {
                machine: Mutex::new(machine),
                coordinator,
            }
        })
    }

    /// Enters `Idle`.
    pub fn start(&self) {
        self.machine.lock().start(ButtonState::Idle);
    }

    pub fn handle_press(&self) {
        self.machine.lock().handle_press();
    }

    pub fn handle_release(&self) {
        self.machine.lock().handle_release();
    }

    pub fn state(&self) -> Option<ButtonState> {
        self.machine.lock().current()
    }

    pub fn previous_state(&self) -> Option<ButtonState> {
        self.machine.lock().previous()
    }

    pub fn button_pressed(&self) -> bool {
        self.machine.lock().data().button_pressed
    }

    pub fn coordinator(&self) -> &ButtonCoordinator {
        &self.coordinator
    }
}
