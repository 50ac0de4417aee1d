use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shortest and longest cadence accepted for either ingestion timer
const MIN_INTERVAL_SECONDS: u64 = 1;
const MAX_INTERVAL_SECONDS: u64 = 10;

/// Application configuration loaded from a TOML file
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a working configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ingestion: IngestionConfig,
    pub thresholds: ThresholdConfig,
    pub history: HistoryConfig,
    pub alerts: AlertsConfig,
}

/// Where readings come from and how often
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestionConfig {
    /// Live feed for headline vitals; synthetic data only when unset
    pub vitals_url: Option<String>,
    /// Live feed for motion sensors; synthetic data only when unset
    pub motion_url: Option<String>,
    /// Slow tick: headline vitals and alert re-evaluation
    pub vitals_interval_seconds: u64,
    /// Fast tick: raw motion sensor echo
    pub motion_interval_seconds: u64,
    /// Timeout for a single feed request
    pub request_timeout_seconds: u64,
    /// Subject the readings are stored under
    pub subject_id: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            vitals_url: None,
            motion_url: None,
            vitals_interval_seconds: 10,
            motion_interval_seconds: 1,
            request_timeout_seconds: 5,
            subject_id: "patient-1".to_string(),
        }
    }
}

/// Clinical band boundaries used by the rule engine
///
/// Upper-bound metrics alert when the value is strictly above the bound;
/// SpO2 alerts when strictly below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub heart_rate_danger: f64,
    pub heart_rate_warning: f64,
    pub systolic_danger: f64,
    pub systolic_warning: f64,
    pub diastolic_danger: f64,
    pub diastolic_warning: f64,
    pub blood_sugar_danger: f64,
    pub blood_sugar_warning: f64,
    pub spo2_danger: f64,
    pub spo2_warning: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            heart_rate_danger: 100.0,
            heart_rate_warning: 90.0,
            systolic_danger: 140.0,
            systolic_warning: 130.0,
            diastolic_danger: 90.0,
            diastolic_warning: 85.0,
            blood_sugar_danger: 140.0,
            blood_sugar_warning: 120.0,
            spo2_danger: 90.0,
            spo2_warning: 95.0,
        }
    }
}

impl ThresholdConfig {
    /// Check that every warning band sits on the safe side of its danger band
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upper_bounds = [
            ("heart_rate", self.heart_rate_warning, self.heart_rate_danger),
            ("systolic", self.systolic_warning, self.systolic_danger),
            ("diastolic", self.diastolic_warning, self.diastolic_danger),
            (
                "blood_sugar",
                self.blood_sugar_warning,
                self.blood_sugar_danger,
            ),
        ];

        for (name, warning, danger) in upper_bounds {
            if !warning.is_finite() || !danger.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "{} thresholds must be finite numbers",
                    name
                )));
            }
            if warning > danger {
                return Err(ConfigError::ValidationError(format!(
                    "{}_warning ({}) must not exceed {}_danger ({})",
                    name, warning, name, danger
                )));
            }
        }

        if !self.spo2_warning.is_finite() || !self.spo2_danger.is_finite() {
            return Err(ConfigError::ValidationError(
                "spo2 thresholds must be finite numbers".to_string(),
            ));
        }
        if self.spo2_warning < self.spo2_danger {
            return Err(ConfigError::ValidationError(format!(
                "spo2_warning ({}) must not be below spo2_danger ({})",
                self.spo2_warning, self.spo2_danger
            )));
        }

        Ok(())
    }
}

/// Rolling reading history kept for live charts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of most recent readings retained
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

/// Alert presentation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertsConfig {
    /// Seed each viewer with the built-in reminder and system notifications
    pub standing_notifications: bool,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            standing_notifications: true,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML for this schema and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ingestion = &self.ingestion;
        for (name, value) in [
            ("vitals_interval_seconds", ingestion.vitals_interval_seconds),
            ("motion_interval_seconds", ingestion.motion_interval_seconds),
        ] {
            if !(MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between {} and {} seconds, got {}",
                    name, MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS, value
                )));
            }
        }

        if ingestion.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_seconds must be greater than zero".to_string(),
            ));
        }

        if ingestion.subject_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "subject_id must not be empty".to_string(),
            ));
        }

        if self.history.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "history capacity must be greater than zero".to_string(),
            ));
        }

        self.thresholds.validate()
    }
}
