//! Built-in threshold rules for the vitals monitor
//!
//! Each rule classifies one metric of a reading into a danger band, a warning
//! band or nothing. Upper-bound metrics fire when the value is strictly above
//! the bound; SpO2 fires when strictly below.

use crate::error::EvaluationError;
use crate::events::{format_number, Alert, AlertType, AlertValue, Metric, Priority, Reading};
use crate::rules::MetricRule;

/// Build an engine alert for a metric crossing a band
///
/// The id combines the metric with the reading time so that repeated
/// evaluation of the same reading always yields the same id.
fn band_alert(
    metric: Metric,
    alert_type: AlertType,
    reading: &Reading,
    value: AlertValue,
    threshold: String,
    message: &str,
) -> Alert {
    let priority = match alert_type {
        AlertType::Danger => Priority::High,
        AlertType::Warning => Priority::Medium,
        _ => Priority::Low,
    };

    Alert::new(
        format!("{}-{}", metric.as_str(), reading.timestamp.timestamp_millis()),
        alert_type,
        metric.as_str(),
        message,
    )
    .with_value(value)
    .with_threshold(threshold)
    .with_priority(priority)
    .with_timestamp(reading.timestamp)
}

/// Reject values no sensor can produce
fn checked(metric: Metric, value: f64) -> Result<f64, EvaluationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EvaluationError::InvalidValue {
            metric: metric.as_str().to_string(),
            value,
        })
    }
}

/// Rule for a single value that is unhealthy above its bounds
struct UpperBandRule {
    metric: Metric,
    danger: f64,
    warning: f64,
    unit: &'static str,
    danger_message: &'static str,
    warning_message: &'static str,
}

impl UpperBandRule {
    fn classify(
        &self,
        reading: &Reading,
        value: Option<f64>,
    ) -> Result<Option<Alert>, EvaluationError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let value = checked(self.metric, value)?;

        let band = if value > self.danger {
            Some((AlertType::Danger, self.danger, self.danger_message))
        } else if value > self.warning {
            Some((AlertType::Warning, self.warning, self.warning_message))
        } else {
            None
        };

        Ok(band.map(|(alert_type, bound, message)| {
            band_alert(
                self.metric,
                alert_type,
                reading,
                AlertValue::Number(value),
                format!("{}{}", format_number(bound), self.unit),
                message,
            )
        }))
    }
}

/// Rule for heart rate in beats per minute
pub struct HeartRateRule {
    inner: UpperBandRule,
}

impl HeartRateRule {
    /// Create a new heart rate rule
    ///
    /// # Arguments
    ///
    /// * `danger` - Rate above which a danger alert is raised
    /// * `warning` - Rate above which a warning alert is raised
    pub fn new(danger: f64, warning: f64) -> Self {
        Self {
            inner: UpperBandRule {
                metric: Metric::HeartRate,
                danger,
                warning,
                unit: " BPM",
                danger_message: "High Heart Rate Alert!",
                warning_message: "Elevated Heart Rate",
            },
        }
    }

    /// Create a default heart rate rule (danger above 100, warning above 90)
    pub fn with_defaults() -> Self {
        Self::new(100.0, 90.0)
    }
}

impl MetricRule for HeartRateRule {
    fn evaluate(&self, reading: &Reading) -> Result<Option<Alert>, EvaluationError> {
        self.inner.classify(reading, reading.heart_rate)
    }

    fn name(&self) -> &str {
        "HeartRateRule"
    }

    fn metric(&self) -> Metric {
        Metric::HeartRate
    }
}

/// Rule for blood sugar in mg/dL
pub struct BloodSugarRule {
    inner: UpperBandRule,
}

impl BloodSugarRule {
    /// Create a new blood sugar rule
    ///
    /// # Arguments
    ///
    /// * `danger` - Level above which a danger alert is raised
    /// * `warning` - Level above which a warning alert is raised
    pub fn new(danger: f64, warning: f64) -> Self {
        Self {
            inner: UpperBandRule {
                metric: Metric::BloodSugar,
                danger,
                warning,
                unit: " mg/dL",
                danger_message: "High Blood Sugar Alert!",
                warning_message: "Elevated Blood Sugar",
            },
        }
    }

    /// Create a default blood sugar rule (danger above 140, warning above 120)
    pub fn with_defaults() -> Self {
        Self::new(140.0, 120.0)
    }
}

impl MetricRule for BloodSugarRule {
    fn evaluate(&self, reading: &Reading) -> Result<Option<Alert>, EvaluationError> {
        self.inner.classify(reading, reading.blood_sugar)
    }

    fn name(&self) -> &str {
        "BloodSugarRule"
    }

    fn metric(&self) -> Metric {
        Metric::BloodSugar
    }
}

/// Rule for blood pressure, treated as a single metric
///
/// Either component crossing a band is enough to raise that band.
pub struct BloodPressureRule {
    pub systolic_danger: f64,
    pub diastolic_danger: f64,
    pub systolic_warning: f64,
    pub diastolic_warning: f64,
}

impl BloodPressureRule {
    /// Create a new blood pressure rule
    ///
    /// # Arguments
    ///
    /// * `systolic_danger` / `diastolic_danger` - Danger band bounds in mmHg
    /// * `systolic_warning` / `diastolic_warning` - Warning band bounds in mmHg
    pub fn new(
        systolic_danger: f64,
        diastolic_danger: f64,
        systolic_warning: f64,
        diastolic_warning: f64,
    ) -> Self {
        Self {
            systolic_danger,
            diastolic_danger,
            systolic_warning,
            diastolic_warning,
        }
    }

    /// Create a default blood pressure rule (danger above 140/90, warning above 130/85)
    pub fn with_defaults() -> Self {
        Self::new(140.0, 90.0, 130.0, 85.0)
    }
}

impl MetricRule for BloodPressureRule {
    fn evaluate(&self, reading: &Reading) -> Result<Option<Alert>, EvaluationError> {
        let Some(bp) = reading.blood_pressure else {
            return Ok(None);
        };
        let systolic = checked(Metric::BloodPressure, bp.systolic)?;
        let diastolic = checked(Metric::BloodPressure, bp.diastolic)?;

        let band = if systolic > self.systolic_danger || diastolic > self.diastolic_danger {
            Some((
                AlertType::Danger,
                self.systolic_danger,
                self.diastolic_danger,
                "High Blood Pressure Alert!",
            ))
        } else if systolic > self.systolic_warning || diastolic > self.diastolic_warning {
            Some((
                AlertType::Warning,
                self.systolic_warning,
                self.diastolic_warning,
                "Elevated Blood Pressure",
            ))
        } else {
            None
        };

        Ok(band.map(|(alert_type, sys_bound, dia_bound, message)| {
            band_alert(
                Metric::BloodPressure,
                alert_type,
                reading,
                AlertValue::Text(bp.to_string()),
                format!(
                    "{}/{} mmHg",
                    format_number(sys_bound),
                    format_number(dia_bound)
                ),
                message,
            )
        }))
    }

    fn name(&self) -> &str {
        "BloodPressureRule"
    }

    fn metric(&self) -> Metric {
        Metric::BloodPressure
    }
}

/// Rule for oxygen saturation, which is unhealthy below its bounds
pub struct SpO2Rule {
    pub danger: f64,
    pub warning: f64,
}

impl SpO2Rule {
    /// Create a new SpO2 rule
    ///
    /// # Arguments
    ///
    /// * `danger` - Saturation below which a danger alert is raised
    /// * `warning` - Saturation below which a warning alert is raised
    pub fn new(danger: f64, warning: f64) -> Self {
        Self { danger, warning }
    }

    /// Create a default SpO2 rule (danger below 90%, warning below 95%)
    pub fn with_defaults() -> Self {
        Self::new(90.0, 95.0)
    }
}

impl MetricRule for SpO2Rule {
    fn evaluate(&self, reading: &Reading) -> Result<Option<Alert>, EvaluationError> {
        let Some(value) = reading.spo2 else {
            return Ok(None);
        };
        let value = checked(Metric::SpO2, value)?;

        let band = if value < self.danger {
            Some((AlertType::Danger, self.danger, "Low Oxygen Saturation Alert!"))
        } else if value < self.warning {
            Some((AlertType::Warning, self.warning, "Low Oxygen Saturation"))
        } else {
            None
        };

        Ok(band.map(|(alert_type, bound, message)| {
            band_alert(
                Metric::SpO2,
                alert_type,
                reading,
                AlertValue::Number(value),
                format!("{}%", format_number(bound)),
                message,
            )
        }))
    }

    fn name(&self) -> &str {
        "SpO2Rule"
    }

    fn metric(&self) -> Metric {
        Metric::SpO2
    }
}
