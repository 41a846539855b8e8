//! Log backend for host runs.

use std::io::Write;
use std::thread;

use env_logger::{Builder, Env};

/// Environment variable holding the log filter, e.g. `debug` or
/// `blinky::button=trace,info`.
pub const LOG_VAR: &str = "BLINKY_LOG";
pub const DEFAULT_FILTER: &str = "info";

/// Logger reading its filter from `env`. Lines carry the level, the thread
/// name (each execution context runs on a named thread) and the target.
pub fn builder(env: Env<'_>) -> Builder {
    let mut builder = Builder::from_env(env);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{:<5} [{}] {}: {}",
            record.level(),
            thread::current().name().unwrap_or("?"),
            record.target(),
            record.args()
        )
    });
    builder
}

/// Installs the logger filtered by `BLINKY_LOG`, `info` when unset.
pub fn init() {
    builder(Env::new().filter_or(LOG_VAR, DEFAULT_FILTER)).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Record};

    const UNSET_VAR: &str = "BLINKY_LOG_NEVER_SET";

    #[test]
    fn unset_variable_uses_default_filter() {
        let logger = builder(Env::new().filter_or(UNSET_VAR, DEFAULT_FILTER)).build();
        assert_eq!(logger.filter(), LevelFilter::Info);
    }

    #[test]
    fn per_target_directives_apply() {
        let logger =
            builder(Env::new().filter_or(UNSET_VAR, "blinky::button=trace,warn")).build();
        assert_eq!(logger.filter(), LevelFilter::Trace);

        let button_trace = Record::builder()
            .level(Level::Trace)
            .target("blinky::button")
            .build();
        let led_info = Record::builder()
            .level(Level::Info)
            .target("blinky::led")
            .build();
        assert!(logger.matches(&button_trace));
        assert!(!logger.matches(&led_info));
    }
}
