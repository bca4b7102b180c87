//! Settings file
//!
//! TOML with three optional sections. Every key has a default, so a missing
//! file or a partial file is fine; unknown keys are rejected so typos do not
//! silently fall back to defaults.
//!
//! ```toml
//! [thresholds]
//! cold_head_k = 4.2
//! pump_lower_bound_k = 45.0
//!
//! [logging]
//! enabled = false
//! path = "temp_log.txt"
//!
//! [schedule]
//! enabled = false
//! start_at = "hh:mm:ss"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use cryo_core::config::{
    ConfigError, ThresholdConfig, Thresholds, DEFAULT_COLD_HEAD_THRESHOLD_K, DEFAULT_LOG_PATH,
    DEFAULT_PUMP_LOWER_BOUND_K, UNSET_SENTINEL,
};

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(ConfigError),
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ThresholdSection {
    cold_head_k: f32,
    pump_lower_bound_k: f32,
}

impl Default for ThresholdSection {
    fn default() -> Self {
        Self {
            cold_head_k: DEFAULT_COLD_HEAD_THRESHOLD_K,
            pump_lower_bound_k: DEFAULT_PUMP_LOWER_BOUND_K,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingSection {
    enabled: bool,
    path: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            path: DEFAULT_LOG_PATH.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScheduleSection {
    enabled: bool,
    start_at: String,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            enabled: false,
            start_at: UNSET_SENTINEL.to_string(),
        }
    }
}

/// Raw settings file contents
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    thresholds: ThresholdSection,
    logging: LoggingSection,
    schedule: ScheduleSection,
}

impl SettingsFile {
    /// Parse settings text
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Validate into a run configuration
    ///
    /// The schedule text is carried as entered; it is checked when a run is
    /// started so the operator sees the error at that point.
    pub fn into_config(self) -> Result<ThresholdConfig, SettingsError> {
        let thresholds = Thresholds {
            cold_head_k: self.thresholds.cold_head_k,
            pump_lower_bound_k: self.thresholds.pump_lower_bound_k,
        };
        let scheduled_start = self
            .schedule
            .enabled
            .then_some(self.schedule.start_at.as_str());

        ThresholdConfig::new(
            thresholds,
            scheduled_start,
            self.logging.enabled,
            &self.logging.path,
        )
        .map_err(SettingsError::Invalid)
    }
}

/// Load and validate the settings file at `path`
///
/// A missing file yields the defaults.
pub fn load(path: &Path) -> Result<ThresholdConfig, SettingsError> {
    match fs::read_to_string(path) {
        Ok(text) => SettingsFile::parse(&text)?.into_config(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ThresholdConfig::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryo_core::config::{ScheduleError, TimeOfDay};

    #[test]
    fn test_empty_file_is_default() {
        let config = SettingsFile::parse("").unwrap().into_config().unwrap();
        assert_eq!(config, ThresholdConfig::default());
    }

    #[test]
    fn test_shipped_file_matches_defaults() {
        let text = include_str!("../../cooldown.toml");
        let config = SettingsFile::parse(text).unwrap().into_config().unwrap();
        assert_eq!(config, ThresholdConfig::default());
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            [thresholds]
            cold_head_k = 3.9
            pump_lower_bound_k = 44.5

            [logging]
            enabled = true
            path = "/var/log/cryo/run.csv"

            [schedule]
            enabled = true
            start_at = "06:30:00"
        "#;
        let config = SettingsFile::parse(text).unwrap().into_config().unwrap();
        assert_eq!(config.thresholds.cold_head_k, 3.9);
        assert_eq!(config.thresholds.pump_lower_bound_k, 44.5);
        assert!(config.logging_enabled);
        assert_eq!(config.log_path.as_str(), "/var/log/cryo/run.csv");
        assert_eq!(
            config.start_time(),
            Ok(Some(TimeOfDay::from_hms(6, 30, 0).unwrap()))
        );
    }

    #[test]
    fn test_disabled_schedule_is_ignored() {
        let text = "[schedule]\nstart_at = \"06:30:00\"\n";
        let config = SettingsFile::parse(text).unwrap().into_config().unwrap();
        assert_eq!(config.start_time(), Ok(None));
    }

    #[test]
    fn test_enabled_sentinel_schedule_kept_for_start_check() {
        let text = "[schedule]\nenabled = true\n";
        let config = SettingsFile::parse(text).unwrap().into_config().unwrap();
        assert_eq!(config.start_time(), Err(ScheduleError::Unset));
    }

    #[test]
    fn test_invalid_threshold() {
        let text = "[thresholds]\ncold_head_k = -4.2\n";
        let result = SettingsFile::parse(text).unwrap().into_config();
        assert!(matches!(
            result,
            Err(SettingsError::Invalid(ConfigError::InvalidColdHeadThreshold))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let text = "[thresholds]\ncold_head = 4.2\n";
        assert!(matches!(
            SettingsFile::parse(text),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let text = "[logging]\nenabled = \"yes\"\n";
        assert!(matches!(
            SettingsFile::parse(text),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("cooldown.toml")).unwrap();
        assert_eq!(config, ThresholdConfig::default());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooldown.toml");
        fs::write(&path, "[logging]\nenabled = true\n").unwrap();
        let config = load(&path).unwrap();
        assert!(config.logging_enabled);
        assert_eq!(config.log_path.as_str(), DEFAULT_LOG_PATH);
    }
}
