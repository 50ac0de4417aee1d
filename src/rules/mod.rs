/// Rule engine and threshold rule implementations
pub mod engine;
pub mod thresholds;

pub use engine::{sort_by_priority, MetricRule, RuleEngine};
pub use thresholds::{BloodPressureRule, BloodSugarRule, HeartRateRule, SpO2Rule};
