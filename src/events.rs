//! Core reading and alert types for the vitals monitor
//!
//! This module defines the data structures that flow through the pipeline:
//! readings produced by ingestion sources and alerts derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// One observation snapshot of vitals and motion sensors
///
/// Headline vitals are optional: motion-only readings from the fast feed carry
/// none of them, and a value the feed sent in an unusable form is dropped
/// rather than failing the whole reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// When the reading was taken
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
    /// Heart rate in beats per minute
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub heart_rate: Option<f64>,
    /// Blood pressure in mmHg
    #[serde(
        default,
        deserialize_with = "lenient_blood_pressure",
        skip_serializing_if = "Option::is_none"
    )]
    pub blood_pressure: Option<BloodPressure>,
    /// Blood sugar in mg/dL
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub blood_sugar: Option<f64>,
    /// Oxygen saturation in percent
    #[serde(
        default,
        rename = "spo2",
        alias = "spO2",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub spo2: Option<f64>,
    /// Angular velocity, degrees per second
    #[serde(default, deserialize_with = "vector_or_zero")]
    pub gyroscope: Vector3,
    /// Linear acceleration, m/s²
    #[serde(default, deserialize_with = "vector_or_zero")]
    pub accelerometer: Vector3,
}

impl Reading {
    /// Create an empty reading (no vitals, zero motion) at the given time
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            heart_rate: None,
            blood_pressure: None,
            blood_sugar: None,
            spo2: None,
            gyroscope: Vector3::default(),
            accelerometer: Vector3::default(),
        }
    }

    /// Create a reading carrying all four headline vitals
    pub fn vitals(
        timestamp: Timestamp,
        heart_rate: f64,
        blood_pressure: BloodPressure,
        blood_sugar: f64,
        spo2: f64,
    ) -> Self {
        Self {
            heart_rate: Some(heart_rate),
            blood_pressure: Some(blood_pressure),
            blood_sugar: Some(blood_sugar),
            spo2: Some(spo2),
            ..Self::empty(timestamp)
        }
    }

    /// Replace the motion vectors of this reading
    pub fn with_motion(mut self, gyroscope: Vector3, accelerometer: Vector3) -> Self {
        self.gyroscope = gyroscope;
        self.accelerometer = accelerometer;
        self
    }

    /// Whether any headline vital is present
    pub fn has_vitals(&self) -> bool {
        self.heart_rate.is_some()
            || self.blood_pressure.is_some()
            || self.blood_sugar.is_some()
            || self.spo2.is_some()
    }
}

/// Systolic/diastolic pair in mmHg
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

impl BloodPressure {
    pub fn new(systolic: f64, diastolic: f64) -> Self {
        Self {
            systolic,
            diastolic,
        }
    }

    /// Interpret a loosely-typed JSON value as blood pressure
    ///
    /// Accepts `"120/80"`, `[120, 80]` and `{"systolic": 120, "diastolic": 80}`,
    /// with either numbers or numeric strings for the components.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::String(text) => text.parse().ok(),
            Value::Array(items) if items.len() == 2 => {
                Some(Self::new(json_number(&items[0])?, json_number(&items[1])?))
            }
            Value::Object(map) => Some(Self::new(
                json_number(map.get("systolic")?)?,
                json_number(map.get("diastolic")?)?,
            )),
            _ => None,
        }
    }
}

impl FromStr for BloodPressure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (systolic, diastolic) = s
            .split_once('/')
            .ok_or_else(|| format!("expected 'systolic/diastolic', got '{}'", s))?;
        let systolic = systolic
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid systolic '{}': {}", systolic, e))?;
        let diastolic = diastolic
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid diastolic '{}': {}", diastolic, e))?;
        Ok(Self::new(systolic, diastolic))
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            format_number(self.systolic),
            format_number(self.diastolic)
        )
    }
}

/// Three-axis sensor vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector3 {
    #[serde(default, deserialize_with = "number_or_zero")]
    pub x: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub y: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Components as an array, in x, y, z order
    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Measurements the rule engine classifies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Metric {
    #[serde(rename = "heartRate")]
    HeartRate,
    #[serde(rename = "bloodPressure")]
    BloodPressure,
    #[serde(rename = "bloodSugar")]
    BloodSugar,
    #[serde(rename = "spO2")]
    SpO2,
}

impl Metric {
    /// Wire name of the metric, as carried in `Alert::metric`
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heartRate",
            Metric::BloodPressure => "bloodPressure",
            Metric::BloodSugar => "bloodSugar",
            Metric::SpO2 => "spO2",
        }
    }

    /// Human-readable label used in alert messages
    pub fn label(&self) -> &'static str {
        match self {
            Metric::HeartRate => "Heart Rate",
            Metric::BloodPressure => "Blood Pressure",
            Metric::BloodSugar => "Blood Sugar",
            Metric::SpO2 => "Oxygen Saturation",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual/semantic kind of an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Info,
    Warning,
    Danger,
    Success,
}

/// Grouping used by viewers to filter alerts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Health,
    System,
    Reminder,
}

/// Presentation priority of an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Offending value carried by an alert: a raw number or a formatted string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AlertValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for AlertValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertValue::Number(n) => f.write_str(&format_number(*n)),
            AlertValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for AlertValue {
    fn from(value: f64) -> Self {
        AlertValue::Number(value)
    }
}

impl From<&str> for AlertValue {
    fn from(value: &str) -> Self {
        AlertValue::Text(value.to_string())
    }
}

impl From<String> for AlertValue {
    fn from(value: String) -> Self {
        AlertValue::Text(value)
    }
}

/// A classified notification shown to viewers
///
/// Alerts are immutable once built. Whether a viewer has hidden an alert is
/// tracked by id outside the alert itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Name of the source measurement
    pub metric: String,
    pub value: AlertValue,
    /// Human-readable description of the boundary crossed
    pub threshold: String,
    pub message: String,
    pub category: AlertCategory,
    pub priority: Priority,
    pub timestamp: Timestamp,
}

impl Alert {
    /// Start building an alert; category defaults to health, priority to low
    pub fn new(
        id: impl Into<String>,
        alert_type: AlertType,
        metric: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            alert_type,
            metric: metric.into(),
            value: AlertValue::Text(String::new()),
            threshold: String::new(),
            message: message.into(),
            category: AlertCategory::Health,
            priority: Priority::Low,
            timestamp: Utc::now(),
        }
    }

    pub fn with_value(mut self, value: impl Into<AlertValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_threshold(mut self, threshold: impl Into<String>) -> Self {
        self.threshold = threshold.into();
        self
    }

    pub fn with_category(mut self, category: AlertCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Render a number without a trailing `.0` when it is integral
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Anything a feed might send where a number is expected
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl NumberLike {
    fn into_f64(self) -> Option<f64> {
        match self {
            NumberLike::Number(n) => Some(n),
            NumberLike::Text(text) => text.trim().parse().ok(),
            NumberLike::Other(_) => None,
        }
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(value.and_then(NumberLike::into_f64))
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.unwrap_or(0.0))
}

fn vector_or_zero<'de, D>(deserializer: D) -> Result<Vector3, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value::<Vector3>(v).ok())
        .unwrap_or_default())
}

fn lenient_blood_pressure<'de, D>(deserializer: D) -> Result<Option<BloodPressure>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(BloodPressure::from_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_reading_serialization() {
        let reading = Reading::vitals(
            fixed_time(),
            72.0,
            BloodPressure::new(120.0, 80.0),
            95.0,
            98.0,
        )
        .with_motion(Vector3::new(0.1, -0.2, 0.3), Vector3::new(1.5, -2.5, 4.0));

        let json = serde_json::to_string(&reading).unwrap();
        let deserialized: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(reading, deserialized);
        assert!(json.contains("\"heartRate\":72.0"));
        assert!(json.contains("\"spo2\":98.0"));
    }

    #[test]
    fn test_reading_accepts_string_encoded_feed() {
        let json = r#"{
            "timestamp": "2024-03-01T12:00:00Z",
            "heartRate": 88,
            "bloodPressure": "125/78",
            "bloodSugar": "101",
            "spo2": 97,
            "gyroscope": {"x": "0.42", "y": "-0.10", "z": "0.00"},
            "accelerometer": {"x": "3.20", "y": "-4.75", "z": "1.05"}
        }"#;

        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.timestamp, fixed_time());
        assert_eq!(reading.heart_rate, Some(88.0));
        assert_eq!(reading.blood_pressure, Some(BloodPressure::new(125.0, 78.0)));
        assert_eq!(reading.blood_sugar, Some(101.0));
        assert_eq!(reading.spo2, Some(97.0));
        assert_eq!(reading.gyroscope, Vector3::new(0.42, -0.10, 0.0));
        assert_eq!(reading.accelerometer, Vector3::new(3.2, -4.75, 1.05));
    }

    #[test]
    fn test_missing_vectors_default_to_zero() {
        let json = r#"{"heartRate": 70, "gyroscope": null}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.gyroscope, Vector3::default());
        assert_eq!(reading.accelerometer, Vector3::default());
        assert!(reading.has_vitals());
    }

    #[test]
    fn test_non_numeric_vital_becomes_absent() {
        let json = r#"{"heartRate": "fast", "bloodSugar": {"bad": true}, "spo2": 96}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.heart_rate, None);
        assert_eq!(reading.blood_sugar, None);
        assert_eq!(reading.spo2, Some(96.0));
    }

    #[test]
    fn test_blood_pressure_shapes() {
        let from_array: Reading =
            serde_json::from_str(r#"{"bloodPressure": [131, 84]}"#).unwrap();
        assert_eq!(
            from_array.blood_pressure,
            Some(BloodPressure::new(131.0, 84.0))
        );

        let from_object: Reading =
            serde_json::from_str(r#"{"bloodPressure": {"systolic": 118, "diastolic": "76"}}"#)
                .unwrap();
        assert_eq!(
            from_object.blood_pressure,
            Some(BloodPressure::new(118.0, 76.0))
        );

        let malformed: Reading = serde_json::from_str(r#"{"bloodPressure": "high"}"#).unwrap();
        assert_eq!(malformed.blood_pressure, None);
    }

    #[test]
    fn test_blood_pressure_display_and_parse() {
        let bp: BloodPressure = "150/95".parse().unwrap();
        assert_eq!(bp, BloodPressure::new(150.0, 95.0));
        assert_eq!(bp.to_string(), "150/95");
        assert_eq!(BloodPressure::new(120.5, 80.0).to_string(), "120.5/80");
        assert!("150".parse::<BloodPressure>().is_err());
        assert!("abc/90".parse::<BloodPressure>().is_err());
    }

    #[test]
    fn test_motion_only_reading_has_no_vitals() {
        let reading = Reading::empty(fixed_time())
            .with_motion(Vector3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 1.0, 1.0));
        assert!(!reading.has_vitals());
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::new("hr-1", AlertType::Danger, "heartRate", "High Heart Rate Alert!")
            .with_value(105.0)
            .with_threshold("100 BPM")
            .with_priority(Priority::High)
            .with_timestamp(fixed_time());

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "danger");
        assert_eq!(json["category"], "health");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["value"], 105.0);

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_alert_value_text_round_trip() {
        let value: AlertValue = serde_json::from_str("\"150/95\"").unwrap();
        assert_eq!(value, AlertValue::Text("150/95".to_string()));
        assert_eq!(AlertValue::Number(92.0).to_string(), "92");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn test_metric_wire_names() {
        assert_eq!(
            serde_json::to_string(&Metric::SpO2).unwrap(),
            "\"spO2\""
        );
        assert_eq!(Metric::HeartRate.as_str(), "heartRate");
        assert_eq!(Metric::BloodPressure.to_string(), "bloodPressure");
        assert_eq!(Metric::BloodSugar.label(), "Blood Sugar");
    }
}
