use thiserror::Error;

/// Errors that can occur while obtaining a reading from a source
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Feed request failed: {0}")]
    RequestFailed(String),

    #[error("Feed returned status {0}")]
    BadStatus(u16),

    #[error("Failed to parse reading: {0}")]
    ParseError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors raised by a single metric rule
///
/// These never escape the rule engine; they only cause the offending metric
/// to be skipped for the reading being evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Invalid value for {metric}: {value}")]
    InvalidValue { metric: String, value: f64 },
}

/// Errors reported by a reading store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid time range: start is after end")]
    InvalidRange,
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
