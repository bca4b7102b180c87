//! Configuration type definitions
//!
//! The run configuration is snapshotted when a cooldown starts and is not
//! touched again until the run is over.

use core::fmt;

use heapless::String;

use super::schedule::{ScheduleError, TimeOfDay};

/// Maximum log path length
pub const MAX_PATH_LEN: usize = 128;

/// Maximum scheduled-start text length (`hh:mm:ss` plus slack)
pub const MAX_TIME_TEXT_LEN: usize = 16;

/// Default cold-head threshold for leaving Stage 1 (K)
pub const DEFAULT_COLD_HEAD_THRESHOLD_K: f32 = 4.2;

/// Default pump lower bound for leaving Stage 1 (K)
pub const DEFAULT_PUMP_LOWER_BOUND_K: f32 = 45.0;

/// Default sample log file
pub const DEFAULT_LOG_PATH: &str = "temp_log.txt";

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Cold-head threshold is not a positive finite temperature
    InvalidColdHeadThreshold,
    /// Pump lower bound is not a positive finite temperature
    InvalidPumpLowerBound,
    /// Log path does not fit
    PathTooLong,
    /// Scheduled start text does not fit
    ScheduleTooLong,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidColdHeadThreshold => {
                f.write_str("cold head threshold must be a positive temperature")
            }
            ConfigError::InvalidPumpLowerBound => {
                f.write_str("pump lower bound must be a positive temperature")
            }
            ConfigError::PathTooLong => {
                write!(f, "log path longer than {} bytes", MAX_PATH_LEN)
            }
            ConfigError::ScheduleTooLong => {
                write!(f, "scheduled start longer than {} bytes", MAX_TIME_TEXT_LEN)
            }
        }
    }
}

/// Stage 1 exit thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    /// Cold head must drop below this (K)
    pub cold_head_k: f32,
    /// Helium pump must rise above this (K)
    pub pump_lower_bound_k: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cold_head_k: DEFAULT_COLD_HEAD_THRESHOLD_K,
            pump_lower_bound_k: DEFAULT_PUMP_LOWER_BOUND_K,
        }
    }
}

impl Thresholds {
    /// Check both thresholds are usable temperatures
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_temperature(self.cold_head_k) {
            return Err(ConfigError::InvalidColdHeadThreshold);
        }
        if !is_temperature(self.pump_lower_bound_k) {
            return Err(ConfigError::InvalidPumpLowerBound);
        }
        Ok(())
    }
}

fn is_temperature(k: f32) -> bool {
    k.is_finite() && k > 0.0
}

/// Run configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThresholdConfig {
    /// Stage 1 exit thresholds
    pub thresholds: Thresholds,
    /// Deferred start time as entered (`None` = start immediately)
    ///
    /// Kept as text so the unset sentinel can be told apart from a
    /// malformed entry when the run is started.
    pub scheduled_start: Option<String<MAX_TIME_TEXT_LEN>>,
    /// Append each sample to the log file
    pub logging_enabled: bool,
    /// Log file destination
    pub log_path: String<MAX_PATH_LEN>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let mut log_path = String::new();
        // DEFAULT_LOG_PATH is shorter than MAX_PATH_LEN
        let _ = log_path.push_str(DEFAULT_LOG_PATH);
        Self {
            thresholds: Thresholds::default(),
            scheduled_start: None,
            logging_enabled: false,
            log_path,
        }
    }
}

impl ThresholdConfig {
    /// Build a validated configuration
    pub fn new(
        thresholds: Thresholds,
        scheduled_start: Option<&str>,
        logging_enabled: bool,
        log_path: &str,
    ) -> Result<Self, ConfigError> {
        thresholds.validate()?;

        let mut path = String::new();
        path.push_str(log_path)
            .map_err(|_| ConfigError::PathTooLong)?;

        let scheduled_start = match scheduled_start {
            Some(text) => {
                let mut s = String::new();
                s.push_str(text).map_err(|_| ConfigError::ScheduleTooLong)?;
                Some(s)
            }
            None => None,
        };

        Ok(Self {
            thresholds,
            scheduled_start,
            logging_enabled,
            log_path: path,
        })
    }

    /// Resolve the scheduled start
    ///
    /// `Ok(None)` means no schedule is armed. The sentinel and malformed
    /// entries are errors; the caller reports them and clears the schedule.
    pub fn start_time(&self) -> Result<Option<TimeOfDay>, ScheduleError> {
        match &self.scheduled_start {
            Some(text) => TimeOfDay::parse(text).map(Some),
            None => Ok(None),
        }
    }

    /// Disarm the scheduled start
    pub fn clear_schedule(&mut self) {
        self.scheduled_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schedule::UNSET_SENTINEL;

    #[test]
    fn test_defaults() {
        let config = ThresholdConfig::default();
        assert_eq!(config.thresholds.cold_head_k, 4.2);
        assert_eq!(config.thresholds.pump_lower_bound_k, 45.0);
        assert!(!config.logging_enabled);
        assert_eq!(config.log_path.as_str(), "temp_log.txt");
        assert_eq!(config.start_time(), Ok(None));
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let bad = Thresholds {
            cold_head_k: f32::NAN,
            pump_lower_bound_k: 45.0,
        };
        assert_eq!(
            ThresholdConfig::new(bad, None, false, "log.csv"),
            Err(ConfigError::InvalidColdHeadThreshold)
        );

        let bad = Thresholds {
            cold_head_k: 4.2,
            pump_lower_bound_k: -1.0,
        };
        assert_eq!(bad.validate(), Err(ConfigError::InvalidPumpLowerBound));
    }

    #[test]
    fn test_path_too_long() {
        let long = [b'a'; MAX_PATH_LEN + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(
            ThresholdConfig::new(Thresholds::default(), None, true, long),
            Err(ConfigError::PathTooLong)
        );
    }

    #[test]
    fn test_sentinel_schedule_rejected_and_cleared() {
        let mut config =
            ThresholdConfig::new(Thresholds::default(), Some(UNSET_SENTINEL), false, "log")
                .unwrap();
        assert_eq!(config.start_time(), Err(ScheduleError::Unset));

        config.clear_schedule();
        assert_eq!(config.start_time(), Ok(None));
    }

    #[test]
    fn test_valid_schedule() {
        let config =
            ThresholdConfig::new(Thresholds::default(), Some("06:30:00"), false, "log").unwrap();
        assert_eq!(
            config.start_time(),
            Ok(Some(TimeOfDay::from_hms(6, 30, 0).unwrap()))
        );
    }
}
