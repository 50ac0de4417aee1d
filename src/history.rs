//! Rolling history of recent readings
//!
//! This module provides the ReadingHistory which keeps the most recent
//! readings in a capacity-bounded buffer for live charts, plus summary
//! statistics over each vital series.

use crate::events::{Reading, Timestamp};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// A single numeric series that can be charted from readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    HeartRate,
    Systolic,
    Diastolic,
    BloodSugar,
    SpO2,
    GyroscopeX,
    GyroscopeY,
    GyroscopeZ,
    AccelerometerX,
    AccelerometerY,
    AccelerometerZ,
}

impl Series {
    /// Headline vital series, charted from the slow tick
    pub const VITALS: [Series; 5] = [
        Series::HeartRate,
        Series::Systolic,
        Series::Diastolic,
        Series::BloodSugar,
        Series::SpO2,
    ];

    /// Motion sensor axes, charted from the fast tick
    pub const MOTION: [Series; 6] = [
        Series::GyroscopeX,
        Series::GyroscopeY,
        Series::GyroscopeZ,
        Series::AccelerometerX,
        Series::AccelerometerY,
        Series::AccelerometerZ,
    ];

    /// Value of this series in a reading, if present
    ///
    /// Motion axes are always present since missing vectors read as zero.
    pub fn value(&self, reading: &Reading) -> Option<f64> {
        match self {
            Series::HeartRate => reading.heart_rate,
            Series::Systolic => reading.blood_pressure.map(|bp| bp.systolic),
            Series::Diastolic => reading.blood_pressure.map(|bp| bp.diastolic),
            Series::BloodSugar => reading.blood_sugar,
            Series::SpO2 => reading.spo2,
            Series::GyroscopeX => Some(reading.gyroscope.x),
            Series::GyroscopeY => Some(reading.gyroscope.y),
            Series::GyroscopeZ => Some(reading.gyroscope.z),
            Series::AccelerometerX => Some(reading.accelerometer.x),
            Series::AccelerometerY => Some(reading.accelerometer.y),
            Series::AccelerometerZ => Some(reading.accelerometer.z),
        }
    }
}

/// Summary of one series over the buffered readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Capacity-bounded buffer of readings, oldest first
///
/// When the buffer is full the oldest reading is evicted. The monitor keeps
/// one for vitals readings and one for motion readings, so the motion charts
/// hold the last `capacity` fast-tick samples.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    buffer: VecDeque<Reading>,
    max_size: usize,
}

impl ReadingHistory {
    /// Create a new ReadingHistory
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum number of readings retained (at least one)
    ///
    /// # Examples
    ///
    /// ```
    /// use vitalwatch::history::ReadingHistory;
    ///
    /// let history = ReadingHistory::new(20);
    /// assert!(history.is_empty());
    /// ```
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            buffer: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add a reading, evicting the oldest if the buffer is full
    pub fn add(&mut self, reading: Reading) {
        self.buffer.push_back(reading);
        while self.buffer.len() > self.max_size {
            self.buffer.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Most recently added reading
    pub fn latest(&self) -> Option<&Reading> {
        self.buffer.back()
    }

    /// All buffered readings, oldest first
    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.buffer.iter()
    }

    /// Readings taken within `duration` of now
    pub fn get_recent(&self, duration: Duration) -> Vec<&Reading> {
        let cutoff = Utc::now() - duration;
        self.buffer
            .iter()
            .filter(|reading| reading.timestamp >= cutoff)
            .collect()
    }

    /// Time/value points of one series, oldest first, skipping gaps
    pub fn points(&self, series: Series) -> Vec<(Timestamp, f64)> {
        self.buffer
            .iter()
            .filter_map(|reading| series.value(reading).map(|v| (reading.timestamp, v)))
            .collect()
    }

    /// Min, max and average of one series; `None` if it has no values
    pub fn stats(&self, series: Series) -> Option<SeriesStats> {
        let values: Vec<f64> = self
            .buffer
            .iter()
            .filter_map(|reading| series.value(reading))
            .filter(|v| v.is_finite())
            .collect();

        if values.is_empty() {
            return None;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = values.iter().sum::<f64>() / values.len() as f64;

        Some(SeriesStats {
            count: values.len(),
            min,
            max,
            average,
        })
    }
}

impl Default for ReadingHistory {
    fn default() -> Self {
        // Twenty points, as shown on the live charts
        Self::new(20)
    }
}
