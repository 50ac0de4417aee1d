/// Configuration file schema and validation
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{AlertsConfig, Config, HistoryConfig, IngestionConfig, ThresholdConfig};
