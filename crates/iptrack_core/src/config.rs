//! Engine configuration surface.
//!
//! # Responsibility
//! - Hold urgency thresholds and deadline defaults.
//! - Load configuration from JSON and fail fast on invalid values.
//!
//! # Invariants
//! - `0 < urgent_days < warning_days < info_days` for every constructed
//!   `UrgencyThresholds`; there is no way to build an unordered value.
//! - `default_lookback_days > 0`.

use crate::logging::normalize_level;
use crate::model::deadline::DEFAULT_LOOKBACK_DAYS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_URGENT_DAYS: u32 = 7;
pub const DEFAULT_WARNING_DAYS: u32 = 14;
pub const DEFAULT_INFO_DAYS: u32 = 30;

/// Threshold configuration that violates the ordering invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    ZeroThreshold(&'static str),
    Misordered {
        urgent_days: u32,
        warning_days: u32,
        info_days: u32,
    },
    ZeroLookback,
    InvalidLogLevel(String),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroThreshold(name) => write!(f, "{name} must be a positive integer"),
            Self::Misordered {
                urgent_days,
                warning_days,
                info_days,
            } => write!(
                f,
                "thresholds must satisfy urgent_days < warning_days < info_days, got {urgent_days} / {warning_days} / {info_days}"
            ),
            Self::ZeroLookback => write!(f, "default_lookback_days must be a positive integer"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigurationError {}

/// Day-count thresholds separating urgency tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdsRecord")]
pub struct UrgencyThresholds {
    urgent_days: u32,
    warning_days: u32,
    info_days: u32,
}

impl UrgencyThresholds {
    /// Validates and builds thresholds.
    pub fn new(
        urgent_days: u32,
        warning_days: u32,
        info_days: u32,
    ) -> Result<Self, ConfigurationError> {
        for (name, value) in [
            ("urgent_days", urgent_days),
            ("warning_days", warning_days),
            ("info_days", info_days),
        ] {
            if value == 0 {
                return Err(ConfigurationError::ZeroThreshold(name));
            }
        }
        if !(urgent_days < warning_days && warning_days < info_days) {
            return Err(ConfigurationError::Misordered {
                urgent_days,
                warning_days,
                info_days,
            });
        }
        Ok(Self {
            urgent_days,
            warning_days,
            info_days,
        })
    }

    pub fn urgent_days(&self) -> u32 {
        self.urgent_days
    }

    pub fn warning_days(&self) -> u32 {
        self.warning_days
    }

    pub fn info_days(&self) -> u32 {
        self.info_days
    }
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            urgent_days: DEFAULT_URGENT_DAYS,
            warning_days: DEFAULT_WARNING_DAYS,
            info_days: DEFAULT_INFO_DAYS,
        }
    }
}

/// Partial thresholds as written in a config file; missing values default.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdsRecord {
    pub urgent_days: Option<u32>,
    pub warning_days: Option<u32>,
    pub info_days: Option<u32>,
}

impl TryFrom<ThresholdsRecord> for UrgencyThresholds {
    type Error = ConfigurationError;

    fn try_from(value: ThresholdsRecord) -> Result<Self, Self::Error> {
        Self::new(
            value.urgent_days.unwrap_or(DEFAULT_URGENT_DAYS),
            value.warning_days.unwrap_or(DEFAULT_WARNING_DAYS),
            value.info_days.unwrap_or(DEFAULT_INFO_DAYS),
        )
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    pub thresholds: UrgencyThresholds,
    /// Lookback applied to new deadlines without an explicit window.
    pub default_lookback_days: u32,
    /// Normalized log level (`trace|debug|info|warn|error`), if configured.
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: UrgencyThresholds::default(),
            default_lookback_days: DEFAULT_LOOKBACK_DAYS,
            log_level: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineConfigFile {
    thresholds: ThresholdsRecord,
    default_lookback_days: Option<u32>,
    log_level: Option<String>,
}

/// Failure while reading or validating a configuration source.
#[derive(Debug)]
pub enum ConfigLoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Configuration(ConfigurationError),
}

impl Display for ConfigLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Configuration(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Configuration(err) => Some(err),
        }
    }
}

impl From<ConfigurationError> for ConfigLoadError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl EngineConfig {
    /// Parses configuration from JSON text.
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigLoadError> {
        let file: EngineConfigFile = serde_json::from_str(text).map_err(ConfigLoadError::Parse)?;
        let thresholds = UrgencyThresholds::try_from(file.thresholds)?;

        let default_lookback_days = file.default_lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
        if default_lookback_days == 0 {
            return Err(ConfigurationError::ZeroLookback.into());
        }

        let log_level = match file.log_level {
            Some(level) => Some(
                normalize_level(&level)
                    .map_err(|err| ConfigurationError::InvalidLogLevel(err.to_string()))?
                    .to_string(),
            ),
            None => None,
        };

        Ok(Self {
            thresholds,
            default_lookback_days,
            log_level,
        })
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigLoadError, ConfigurationError, EngineConfig, UrgencyThresholds};

    #[test]
    fn defaults_match_documented_thresholds() {
        let thresholds = UrgencyThresholds::default();
        assert_eq!(thresholds.urgent_days(), 7);
        assert_eq!(thresholds.warning_days(), 14);
        assert_eq!(thresholds.info_days(), 30);
    }

    #[test]
    fn new_rejects_misordered_and_zero_values() {
        assert!(matches!(
            UrgencyThresholds::new(14, 7, 30),
            Err(ConfigurationError::Misordered { .. })
        ));
        assert!(matches!(
            UrgencyThresholds::new(7, 7, 30),
            Err(ConfigurationError::Misordered { .. })
        ));
        assert_eq!(
            UrgencyThresholds::new(0, 7, 30),
            Err(ConfigurationError::ZeroThreshold("urgent_days"))
        );
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let config = EngineConfig::from_json_str(r#"{"thresholds": {"info_days": 45}}"#).unwrap();
        assert_eq!(config.thresholds.urgent_days(), 7);
        assert_eq!(config.thresholds.info_days(), 45);
        assert_eq!(config.default_lookback_days, 30);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn from_json_reports_configuration_errors() {
        let err = EngineConfig::from_json_str(
            r#"{"thresholds": {"urgent_days": 20, "warning_days": 14, "info_days": 30}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Configuration(ConfigurationError::Misordered { .. })
        ));

        let err = EngineConfig::from_json_str(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Configuration(ConfigurationError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let err = EngineConfig::from_json_str(r#"{"thresholds": {"soon": 3}}"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn thresholds_deserialize_through_validation() {
        let err = serde_json::from_str::<UrgencyThresholds>(
            r#"{"urgent_days": 30, "warning_days": 14, "info_days": 7}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("urgent_days < warning_days"));
    }
}
