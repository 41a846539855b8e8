//! Host run of the blinky demo on simulated pins.
//!
//! The button is pressed for half a second every two seconds. Settings come
//! from `BLINKY_*` environment variables; `BLINKY_LOG` sets the log level.

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use blinky::config::{self, BlinkyConfig};
use blinky::{Blinky, SimBoard};
use log::{error, info};

const PRESS_TIME: Duration = Duration::from_millis(500);
const IDLE_TIME: Duration = Duration::from_millis(1500);

fn main() -> ExitCode {
    blinky::logging::init();

    let config = match BlinkyConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let run_for = match config::run_duration_from_env() {
        Ok(run_for) => run_for,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!("{config:?}");

    let sim = SimBoard::new();
    let mut blinky = match Blinky::new(config, sim.board(config.bit_time)) {
        Ok(blinky) => blinky,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = blinky.start() {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    let started = Instant::now();
    while run_for.map_or(true, |limit| started.elapsed() < limit) {
        sim.press();
        blinky.on_button_edge();
        thread::sleep(PRESS_TIME);
        info!(
            "held: state {:?}, blue {}",
            blinky.button_state(),
            if sim.blue_on() { "on" } else { "off" }
        );

        sim.release();
        thread::sleep(IDLE_TIME);
        info!(
            "released: state {:?}, blue {}",
            blinky.button_state(),
            if sim.blue_on() { "on" } else { "off" }
        );
    }

    blinky.shutdown();
    info!("stopped after {:?}", started.elapsed());
    ExitCode::SUCCESS
}
