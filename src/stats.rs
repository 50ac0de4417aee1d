//! Pipeline statistics for the vitals monitor
//!
//! Tracks how readings were obtained, how many alerts were raised, how
//! broadcast delivery went and how long rule evaluation takes, so the binary
//! can report the health of the pipeline itself.

use crate::broadcast::PublishReport;
use crate::ingestion::ReadingOrigin;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Point-in-time view of the pipeline counters
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    /// Readings obtained from the live feeds
    pub live_readings: u64,
    /// Readings substituted by the synthetic generator
    pub fallback_readings: u64,
    /// Alerts produced by the rule engine
    pub alerts_emitted: u64,
    /// Events handed to subscribers
    pub events_delivered: u64,
    /// Subscribers removed because they had disconnected
    pub subscribers_dropped: u64,
    /// Readings the store failed to persist
    pub store_failures: u64,
    /// Average rule evaluation time over recent samples
    pub avg_evaluation_micros: f64,
    /// Share of readings that came from a live feed, as a percentage (0-100)
    pub live_ratio: f64,
    pub timestamp: DateTime<Utc>,
}

/// Shared, lock-light counters updated by the monitor
#[derive(Debug)]
pub struct PipelineStats {
    live_readings: AtomicU64,
    fallback_readings: AtomicU64,
    alerts_emitted: AtomicU64,
    events_delivered: AtomicU64,
    subscribers_dropped: AtomicU64,
    store_failures: AtomicU64,
    /// Recent evaluation latencies (bounded)
    evaluation_latencies: Mutex<VecDeque<Duration>>,
    max_latency_samples: usize,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            live_readings: AtomicU64::new(0),
            fallback_readings: AtomicU64::new(0),
            alerts_emitted: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            evaluation_latencies: Mutex::new(VecDeque::new()),
            max_latency_samples: 100,
        }
    }

    pub fn record_reading(&self, origin: ReadingOrigin) {
        let counter = match origin {
            ReadingOrigin::Live => &self.live_readings,
            ReadingOrigin::Fallback => &self.fallback_readings,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alerts(&self, count: usize) {
        self.alerts_emitted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_publish(&self, report: PublishReport) {
        self.events_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.subscribers_dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long one rule evaluation took
    pub fn record_evaluation_latency(&self, duration: Duration) {
        let mut latencies = self
            .evaluation_latencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        latencies.push_back(duration);

        // Keep only the most recent samples
        while latencies.len() > self.max_latency_samples {
            latencies.pop_front();
        }
        debug!("Evaluation took {:?}", duration);
    }

    fn avg_evaluation_micros(&self) -> f64 {
        let latencies = self
            .evaluation_latencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if latencies.is_empty() {
            return 0.0;
        }
        let total: f64 = latencies.iter().map(|d| d.as_secs_f64() * 1_000_000.0).sum();
        total / latencies.len() as f64
    }

    /// Collect the current counters
    pub fn snapshot(&self) -> PipelineSnapshot {
        let live_readings = self.live_readings.load(Ordering::Relaxed);
        let fallback_readings = self.fallback_readings.load(Ordering::Relaxed);
        let total = live_readings + fallback_readings;
        let live_ratio = if total == 0 {
            0.0
        } else {
            live_readings as f64 / total as f64 * 100.0
        };

        PipelineSnapshot {
            live_readings,
            fallback_readings,
            alerts_emitted: self.alerts_emitted.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            avg_evaluation_micros: self.avg_evaluation_micros(),
            live_ratio,
            timestamp: Utc::now(),
        }
    }

    /// Log a one-line summary and warn about degraded operation
    pub fn log_summary(&self) -> PipelineSnapshot {
        let snapshot = self.snapshot();

        info!(
            "Pipeline: live={}, fallback={}, alerts={}, delivered={}, dropped={}, store_failures={}, eval={:.1}us",
            snapshot.live_readings,
            snapshot.fallback_readings,
            snapshot.alerts_emitted,
            snapshot.events_delivered,
            snapshot.subscribers_dropped,
            snapshot.store_failures,
            snapshot.avg_evaluation_micros
        );

        if snapshot.live_readings == 0 && snapshot.fallback_readings > 0 {
            warn!("No live readings received, all data is synthetic");
        }
        if snapshot.store_failures > 0 {
            warn!("{} readings were not persisted", snapshot.store_failures);
        }

        snapshot
    }
}

/// Helper to measure and record one evaluation
pub struct EvaluationTimer {
    start_time: Instant,
    stats: Arc<PipelineStats>,
}

impl EvaluationTimer {
    pub fn start(stats: Arc<PipelineStats>) -> Self {
        Self {
            start_time: Instant::now(),
            stats,
        }
    }

    /// Finish timing and record the latency
    pub fn finish(self) {
        self.stats
            .record_evaluation_latency(self.start_time.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let snapshot = PipelineStats::new().snapshot();
        assert_eq!(snapshot.live_readings, 0);
        assert_eq!(snapshot.fallback_readings, 0);
        assert_eq!(snapshot.avg_evaluation_micros, 0.0);
        assert_eq!(snapshot.live_ratio, 0.0);
    }

    #[test]
    fn test_reading_origins_and_ratio() {
        let stats = PipelineStats::new();
        stats.record_reading(ReadingOrigin::Live);
        stats.record_reading(ReadingOrigin::Live);
        stats.record_reading(ReadingOrigin::Live);
        stats.record_reading(ReadingOrigin::Fallback);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.live_readings, 3);
        assert_eq!(snapshot.fallback_readings, 1);
        assert_eq!(snapshot.live_ratio, 75.0);
    }

    #[test]
    fn test_publish_and_alert_counters() {
        let stats = PipelineStats::new();
        stats.record_alerts(4);
        stats.record_publish(PublishReport {
            delivered: 2,
            dropped: 1,
        });
        stats.record_publish(PublishReport {
            delivered: 2,
            dropped: 0,
        });
        stats.record_store_failure();

        let snapshot = stats.log_summary();
        assert_eq!(snapshot.alerts_emitted, 4);
        assert_eq!(snapshot.events_delivered, 4);
        assert_eq!(snapshot.subscribers_dropped, 1);
        assert_eq!(snapshot.store_failures, 1);
    }

    #[test]
    fn test_latency_samples_are_bounded() {
        let stats = PipelineStats::new();
        for _ in 0..150 {
            stats.record_evaluation_latency(Duration::from_micros(10));
        }
        stats.record_evaluation_latency(Duration::from_micros(110));

        let latencies = stats.evaluation_latencies.lock().unwrap();
        assert_eq!(latencies.len(), 100);
        drop(latencies);

        let avg = stats.snapshot().avg_evaluation_micros;
        assert!((avg - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_evaluation_timer() {
        let stats = Arc::new(PipelineStats::new());
        let timer = EvaluationTimer::start(Arc::clone(&stats));
        std::thread::sleep(Duration::from_millis(2));
        timer.finish();

        assert!(stats.snapshot().avg_evaluation_micros >= 2000.0);
    }
}
