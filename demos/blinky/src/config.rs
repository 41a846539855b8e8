//! Application configuration.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Environment variable overriding the Morse A period (milliseconds).
pub const MORSE_A_MS_VAR: &str = "BLINKY_MORSE_A_MS";
/// Environment variable overriding the Morse B period (milliseconds).
pub const MORSE_B_MS_VAR: &str = "BLINKY_MORSE_B_MS";
/// Environment variable overriding the secondary LED blink period.
pub const BLINK_MS_VAR: &str = "BLINKY_BLINK_MS";
/// Environment variable overriding the button watchdog period.
pub const WATCHDOG_MS_VAR: &str = "BLINKY_WATCHDOG_MS";
/// Environment variable bounding how long the host demo runs.
pub const RUN_MS_VAR: &str = "BLINKY_RUN_MS";

/// Invalid configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be non-zero")]
    ZeroPeriod { field: &'static str },
    #[error("{var}={value:?} is not a whole number of milliseconds")]
    InvalidMillis { var: &'static str, value: String },
}

/// Periods and patterns of the demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkyConfig {
    pub morse_a_period: Duration,
    pub morse_a_pattern: u32,
    pub morse_b_period: Duration,
    pub morse_b_pattern: u32,
    /// Half period of the secondary LED while the button is held.
    pub blink_period: Duration,
    /// Button sampling period while a press is being tracked.
    pub watchdog_period: Duration,
    /// Duration of one bit of a pulse pattern.
    pub bit_time: Duration,
}

impl Default for BlinkyConfig {
    fn default() -> Self {
        Self {
            morse_a_period: Duration::from_millis(100),
            morse_a_pattern: 0xA8EE_E2A0,
            morse_b_period: Duration::from_millis(200),
            morse_b_pattern: 0xE22A_3800,
            blink_period: Duration::from_millis(100),
            watchdog_period: Duration::from_millis(50),
            bit_time: Duration::from_millis(1),
        }
    }
}

impl BlinkyConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BlinkyConfigBuilder {
        BlinkyConfigBuilder::default()
    }

    /// Rejects periods that would make a timer fire continuously.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("morse_a_period", self.morse_a_period),
            ("morse_b_period", self.morse_b_period),
            ("blink_period", self.blink_period),
            ("watchdog_period", self.watchdog_period),
        ];
        match periods.iter().find(|(_, period)| period.is_zero()) {
            Some(&(field, _)) => Err(ConfigError::ZeroPeriod { field }),
            None => Ok(()),
        }
    }

    /// Defaults overridden by the `BLINKY_*_MS` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(period) = millis(&lookup, MORSE_A_MS_VAR)? {
            builder = builder.morse_a_period(period);
        }
        if let Some(period) = millis(&lookup, MORSE_B_MS_VAR)? {
            builder = builder.morse_b_period(period);
        }
        if let Some(period) = millis(&lookup, BLINK_MS_VAR)? {
            builder = builder.blink_period(period);
        }
        if let Some(period) = millis(&lookup, WATCHDOG_MS_VAR)? {
            builder = builder.watchdog_period(period);
        }
        builder.build()
    }
}

/// How long the host demo should run; `None` means forever.
pub fn run_duration_from_env() -> Result<Option<Duration>, ConfigError> {
    let lookup = |var: &'static str| env::var(var).ok();
    millis(&lookup, RUN_MS_VAR)
}

fn millis<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidMillis { var, value: raw })
}

/// Builder for [`BlinkyConfig`].
#[derive(Debug, Default)]
pub struct BlinkyConfigBuilder {
    config: BlinkyConfig,
}

impl BlinkyConfigBuilder {
    /// Sets how often Morse A is sent.
    pub fn morse_a_period(mut self, period: Duration) -> Self {
        self.config.morse_a_period = period;
        self
    }

    pub fn morse_a_pattern(mut self, pattern: u32) -> Self {
        self.config.morse_a_pattern = pattern;
        self
    }

    /// Sets how often Morse B is sent.
    pub fn morse_b_period(mut self, period: Duration) -> Self {
        self.config.morse_b_period = period;
        self
    }

    pub fn morse_b_pattern(mut self, pattern: u32) -> Self {
        self.config.morse_b_pattern = pattern;
        self
    }

    pub fn blink_period(mut self, period: Duration) -> Self {
        self.config.blink_period = period;
        self
    }

    pub fn watchdog_period(mut self, period: Duration) -> Self {
        self.config.watchdog_period = period;
        self
    }

    /// Sets the pulse bit time. Zero sends patterns without delays.
    pub fn bit_time(mut self, bit_time: Duration) -> Self {
        self.config.bit_time = bit_time;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<BlinkyConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&'static str) -> Option<String> {
        move |var| {
            vars.iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn defaults_match_the_board_firmware() {
        let config = BlinkyConfig::default();
        assert_eq!(config.morse_a_period, Duration::from_millis(100));
        assert_eq!(config.morse_b_period, Duration::from_millis(200));
        assert_eq!(config.blink_period, Duration::from_millis(100));
        assert_eq!(config.watchdog_period, Duration::from_millis(50));
        assert_eq!(config.morse_a_pattern, 0xA8EE_E2A0);
        assert_eq!(config.morse_b_pattern, 0xE22A_3800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_zero_periods() {
        let err = BlinkyConfig::builder()
            .watchdog_period(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroPeriod { field: "watchdog_period" });
    }

    #[test]
    fn lookup_overrides_selected_periods() {
        let config =
            BlinkyConfig::from_lookup(lookup(&[(BLINK_MS_VAR, "250"), (MORSE_B_MS_VAR, " 40 ")]))
                .unwrap();
        assert_eq!(config.blink_period, Duration::from_millis(250));
        assert_eq!(config.morse_b_period, Duration::from_millis(40));
        assert_eq!(config.morse_a_period, Duration::from_millis(100));
    }

    #[test]
    fn malformed_value_names_the_variable() {
        let err = BlinkyConfig::from_lookup(lookup(&[(WATCHDOG_MS_VAR, "fast")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidMillis {
                var: WATCHDOG_MS_VAR,
                value: "fast".to_string()
            }
        );
    }
}
