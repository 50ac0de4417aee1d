use crate::config::ThresholdConfig;
use crate::error::EvaluationError;
use crate::events::{Alert, Metric, Reading};
use crate::rules::thresholds::{BloodPressureRule, BloodSugarRule, HeartRateRule, SpO2Rule};
use log::debug;

/// Engine that classifies a reading against every configured metric rule
///
/// Evaluation is pure: no I/O, no shared state, and the same reading always
/// yields the same alerts.
pub struct RuleEngine {
    rules: Vec<Box<dyn MetricRule>>,
}

/// Trait for a rule that classifies one metric of a reading
pub trait MetricRule: Send + Sync {
    /// Classify the reading for this rule's metric
    ///
    /// Returns `Ok(None)` when the metric is absent or within its normal range.
    /// At most one alert is returned; the most severe matching band wins.
    fn evaluate(&self, reading: &Reading) -> Result<Option<Alert>, EvaluationError>;

    /// Get a human-readable name for this rule
    fn name(&self) -> &str;

    /// The metric this rule classifies
    fn metric(&self) -> Metric;
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_thresholds(&ThresholdConfig::default())
    }
}

impl RuleEngine {
    /// Create a new rule engine with no rules
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create an engine with one rule per metric using the given bounds
    ///
    /// Rules are registered in heart rate, blood pressure, blood sugar, SpO2
    /// order, which is also the order of the evaluated alerts.
    pub fn with_thresholds(thresholds: &ThresholdConfig) -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(HeartRateRule::new(
            thresholds.heart_rate_danger,
            thresholds.heart_rate_warning,
        )));
        engine.add_rule(Box::new(BloodPressureRule::new(
            thresholds.systolic_danger,
            thresholds.diastolic_danger,
            thresholds.systolic_warning,
            thresholds.diastolic_warning,
        )));
        engine.add_rule(Box::new(BloodSugarRule::new(
            thresholds.blood_sugar_danger,
            thresholds.blood_sugar_warning,
        )));
        engine.add_rule(Box::new(SpO2Rule::new(
            thresholds.spo2_danger,
            thresholds.spo2_warning,
        )));
        engine
    }

    /// Add a metric rule to the engine
    pub fn add_rule(&mut self, rule: Box<dyn MetricRule>) {
        self.rules.push(rule);
    }

    /// Evaluate all rules against a reading and collect the alerts that fire
    ///
    /// A rule that rejects its input only skips its own metric.
    pub fn evaluate(&self, reading: &Reading) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for rule in &self.rules {
            match rule.evaluate(reading) {
                Ok(Some(alert)) => alerts.push(alert),
                Ok(None) => {}
                Err(e) => debug!(
                    "Skipping {} for reading at {}: {}",
                    rule.name(),
                    reading.timestamp,
                    e
                ),
            }
        }

        alerts
    }

    /// Get the number of configured rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Stable sort of alerts from high to low priority
pub fn sort_by_priority(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| b.priority.cmp(&a.priority));
}
