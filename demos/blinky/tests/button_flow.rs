//! Button press, hold and release through the whole application, stepped on
//! a manual clock.

use std::sync::Arc;
use std::time::Duration;

use blinky::{Blinky, BlinkyConfig, ButtonState, SimBoard};
use blinky_runtime::{ManualClock, TimerService};

const STEP: Duration = Duration::from_millis(10);

struct Rig {
    clock: Arc<ManualClock>,
    sim: SimBoard,
    blinky: Blinky,
}

impl Rig {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let timers = TimerService::new(Arc::clone(&clock));
        let sim = SimBoard::new();
        let config = BlinkyConfig::builder()
            .bit_time(Duration::ZERO)
            .build()
            .unwrap();
        let blinky = Blinky::with_timers(config, sim.board(Duration::ZERO), timers).unwrap();
        Self { clock, sim, blinky }
    }

    /// Runs the timer service in small steps until `ms` after the origin.
    fn run_to(&self, ms: u64) {
        let target = Duration::from_millis(ms);
        while self.clock.elapsed() < target {
            self.clock.advance(STEP);
            self.blinky.timers().fire_due();
        }
    }

    fn press_edge(&self) {
        self.sim.press();
        self.blinky.on_button_edge();
        self.blinky.work().run_pending();
    }

    fn state(&self) -> Option<ButtonState> {
        self.blinky.button_state()
    }
}

#[test]
fn press_hold_release_blinks_then_returns_to_idle() {
    let rig = Rig::new();
    assert_eq!(rig.state(), Some(ButtonState::Idle));

    rig.sim.press();
    rig.blinky.on_button_edge();
    // The edge only queues work.
    assert_eq!(rig.state(), Some(ButtonState::Idle));
    assert_eq!(rig.blinky.work().run_pending(), 1);

    let button = rig.blinky.button();
    let coordinator = button.coordinator();
    assert_eq!(rig.state(), Some(ButtonState::ButtonPressed));
    assert_eq!(button.previous_state(), Some(ButtonState::Idle));
    assert!(button.button_pressed());
    assert!(coordinator.is_watchdog_enabled());
    assert_eq!(
        coordinator.watchdog_timer().deadline(),
        Some(rig.clock.origin() + Duration::from_millis(50))
    );

    // First sample sees the press; the blink starts one period later.
    rig.run_to(50);
    assert!(coordinator.last_observed_pressed());
    assert!(coordinator.blink_timer().is_armed());
    assert!(!rig.sim.blue_on());

    rig.run_to(150);
    assert!(rig.sim.blue_on());
    rig.run_to(250);
    assert!(!rig.sim.blue_on());
    rig.run_to(350);
    assert!(rig.sim.blue_on());

    rig.sim.release();
    rig.run_to(400);
    assert_eq!(rig.state(), Some(ButtonState::Idle));
    assert!(!button.button_pressed());
    assert!(!coordinator.is_watchdog_enabled());
    assert!(!coordinator.watchdog_timer().is_armed());
    assert!(!coordinator.blink_timer().is_armed());
    assert!(!rig.sim.blue_on());

    // Nothing is left running.
    let before = rig.sim.blue.write_count();
    rig.run_to(1_400);
    assert_eq!(rig.sim.blue.write_count(), before);
    assert_eq!(rig.blinky.timers().next_deadline(), None);
}

#[test]
fn second_edge_while_pressed_is_ignored() {
    let rig = Rig::new();
    rig.press_edge();
    let deadline = rig.blinky.button().coordinator().watchdog_timer().deadline();

    rig.run_to(20);
    rig.press_edge();
    assert_eq!(rig.state(), Some(ButtonState::ButtonPressed));
    assert_eq!(
        rig.blinky.button().coordinator().watchdog_timer().deadline(),
        deadline
    );
}

#[test]
fn tap_shorter_than_one_sample_keeps_tracking() {
    let rig = Rig::new();
    rig.press_edge();
    rig.sim.release();

    // The watchdog never saw the press, so there is no release edge either.
    rig.run_to(300);
    assert_eq!(rig.state(), Some(ButtonState::ButtonPressed));
    assert!(!rig.sim.blue_on());
    assert!(rig.blinky.button().coordinator().watchdog_timer().is_armed());

    rig.sim.press();
    rig.run_to(350);
    assert!(rig.blinky.button().coordinator().last_observed_pressed());
    rig.sim.release();
    rig.run_to(400);
    assert_eq!(rig.state(), Some(ButtonState::Idle));
}

#[test]
fn new_press_after_release_starts_fresh() {
    let rig = Rig::new();
    rig.press_edge();
    rig.run_to(60);
    rig.sim.release();
    rig.run_to(110);
    assert_eq!(rig.state(), Some(ButtonState::Idle));

    rig.press_edge();
    let coordinator = rig.blinky.button().coordinator();
    assert_eq!(rig.state(), Some(ButtonState::ButtonPressed));
    assert!(!coordinator.last_observed_pressed());
    assert!(!coordinator.blink_timer().is_armed());
    rig.run_to(160);
    assert!(coordinator.blink_timer().is_armed());
}

#[test]
fn edges_beyond_work_queue_capacity_are_dropped() {
    let rig = Rig::new();
    let capacity = blinky::app::WORK_QUEUE_DEPTH;
    for _ in 0..capacity + 2 {
        rig.blinky.on_button_edge();
    }

    assert_eq!(rig.blinky.work().dropped(), 2);
    assert_eq!(rig.blinky.work().run_pending(), capacity);
    assert_eq!(rig.state(), Some(ButtonState::ButtonPressed));
}
