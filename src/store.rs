//! Persistence of readings per subject
//!
//! The monitor writes every vitals reading through a `ReadingStore`. Store
//! failures are logged by the caller and never stop the pipeline.

use crate::error::StoreError;
use crate::events::{Reading, Timestamp};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

/// Storage collaborator for readings keyed by subject and timestamp
#[cfg_attr(test, mockall::automock)]
pub trait ReadingStore: Send + Sync {
    /// Store a reading; a reading with the same timestamp is replaced
    fn insert(&self, subject: &str, reading: Reading) -> Result<(), StoreError>;

    /// Most recent reading for a subject
    fn latest(&self, subject: &str) -> Result<Option<Reading>, StoreError>;

    /// Readings with `start <= timestamp <= end`, oldest first
    fn range(
        &self,
        subject: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Up to `limit` readings, newest first
    fn recent(&self, subject: &str, limit: usize) -> Result<Vec<Reading>, StoreError>;
}

/// In-memory store, one ordered map per subject
#[derive(Default)]
pub struct MemoryReadingStore {
    subjects: Mutex<HashMap<String, BTreeMap<Timestamp, Reading>>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of readings stored for a subject
    pub fn count(&self, subject: &str) -> usize {
        self.subjects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject)
            .map_or(0, BTreeMap::len)
    }
}

impl ReadingStore for MemoryReadingStore {
    fn insert(&self, subject: &str, reading: Reading) -> Result<(), StoreError> {
        self.subjects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(subject.to_string())
            .or_default()
            .insert(reading.timestamp, reading);
        Ok(())
    }

    fn latest(&self, subject: &str) -> Result<Option<Reading>, StoreError> {
        let subjects = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(subjects
            .get(subject)
            .and_then(|readings| readings.values().next_back().cloned()))
    }

    fn range(
        &self,
        subject: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, StoreError> {
        if start > end {
            return Err(StoreError::InvalidRange);
        }

        let subjects = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(subjects
            .get(subject)
            .map(|readings| readings.range(start..=end).map(|(_, r)| r.clone()).collect())
            .unwrap_or_default())
    }

    fn recent(&self, subject: &str, limit: usize) -> Result<Vec<Reading>, StoreError> {
        let subjects = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(subjects
            .get(subject)
            .map(|readings| readings.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn base() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn reading(offset_seconds: i64, hr: f64) -> Reading {
        Reading {
            heart_rate: Some(hr),
            ..Reading::empty(base() + Duration::seconds(offset_seconds))
        }
    }

    fn heart_rates(readings: &[Reading]) -> Vec<f64> {
        readings.iter().filter_map(|r| r.heart_rate).collect()
    }

    #[test]
    fn test_latest_is_newest_timestamp_not_last_insert() {
        let store = MemoryReadingStore::new();
        store.insert("p1", reading(20, 80.0)).unwrap();
        store.insert("p1", reading(10, 70.0)).unwrap();

        let latest = store.latest("p1").unwrap().unwrap();
        assert_eq!(latest.heart_rate, Some(80.0));
        assert!(store.latest("unknown").unwrap().is_none());
    }

    #[test]
    fn test_range_is_inclusive_and_ascending() {
        let store = MemoryReadingStore::new();
        for (offset, hr) in [(30, 73.0), (0, 70.0), (10, 71.0), (20, 72.0)] {
            store.insert("p1", reading(offset, hr)).unwrap();
        }

        let readings = store
            .range(
                "p1",
                base() + Duration::seconds(10),
                base() + Duration::seconds(20),
            )
            .unwrap();
        assert_eq!(heart_rates(&readings), vec![71.0, 72.0]);
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let store = MemoryReadingStore::new();
        let result = store.range("p1", base() + Duration::seconds(1), base());
        assert!(matches!(result, Err(StoreError::InvalidRange)));
    }

    #[test]
    fn test_recent_is_descending_and_limited() {
        let store = MemoryReadingStore::new();
        for i in 0..5 {
            store.insert("p1", reading(i * 10, 70.0 + i as f64)).unwrap();
        }

        let readings = store.recent("p1", 3).unwrap();
        assert_eq!(heart_rates(&readings), vec![74.0, 73.0, 72.0]);
        assert!(store.recent("p2", 3).unwrap().is_empty());
    }

    #[test]
    fn test_subjects_are_isolated() {
        let store = MemoryReadingStore::new();
        store.insert("p1", reading(0, 70.0)).unwrap();
        store.insert("p2", reading(0, 90.0)).unwrap();
        store.insert("p2", reading(0, 91.0)).unwrap();

        assert_eq!(store.count("p1"), 1);
        assert_eq!(store.count("p2"), 1);
        assert_eq!(store.latest("p2").unwrap().unwrap().heart_rate, Some(91.0));
    }
}
