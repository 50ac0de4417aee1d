//! Orchestration of the reading pipeline
//!
//! The monitor drives two independent timers on the tokio runtime. The fast
//! tick fetches motion data, records it in the motion history, merges it into
//! the current reading and forwards that to viewers. The slow tick fetches
//! headline vitals, writes them through to the store, records them in the
//! vitals history, evaluates them and publishes the reading followed by the
//! derived alert state. A slow fetch on one timer never delays the other.

use crate::broadcast::{BroadcastChannel, ChannelEvent};
use crate::config::Config;
use crate::error::IngestError;
use crate::events::{Alert, Reading};
use crate::history::ReadingHistory;
use crate::ingestion::{FallbackSource, HttpReadingSource, ReadingSource, SyntheticReadingSource};
use crate::rules::RuleEngine;
use crate::stats::{EvaluationTimer, PipelineStats};
use crate::store::ReadingStore;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Long-lived pipeline driver
pub struct Monitor {
    subject_id: String,
    vitals_interval: Duration,
    motion_interval: Duration,
    engine: RuleEngine,
    vitals_source: FallbackSource,
    motion_source: FallbackSource,
    channel: Arc<BroadcastChannel>,
    store: Arc<dyn ReadingStore>,
    history: Mutex<ReadingHistory>,
    motion_history: Mutex<ReadingHistory>,
    /// Latest vitals reading with the newest motion snapshot merged in
    current: Mutex<Option<Reading>>,
    latest_alerts: Mutex<Vec<Alert>>,
    stats: Arc<PipelineStats>,
}

impl Monitor {
    /// Build a monitor from configuration
    ///
    /// Feeds without a configured URL are served by the synthetic generator.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn new(
        config: &Config,
        channel: Arc<BroadcastChannel>,
        store: Arc<dyn ReadingStore>,
    ) -> Result<Self, IngestError> {
        let timeout = Duration::from_secs(config.ingestion.request_timeout_seconds);

        let vitals_primary = http_source(config.ingestion.vitals_url.as_deref(), timeout)?;
        let motion_primary = http_source(config.ingestion.motion_url.as_deref(), timeout)?;

        let vitals_source = FallbackSource::new(vitals_primary, SyntheticReadingSource::new());
        let motion_source =
            FallbackSource::new(motion_primary, SyntheticReadingSource::new().motion_only());

        Ok(Self::with_sources(
            config,
            vitals_source,
            motion_source,
            channel,
            store,
        ))
    }

    /// Build a monitor around explicit sources
    pub fn with_sources(
        config: &Config,
        vitals_source: FallbackSource,
        motion_source: FallbackSource,
        channel: Arc<BroadcastChannel>,
        store: Arc<dyn ReadingStore>,
    ) -> Self {
        Self {
            subject_id: config.ingestion.subject_id.clone(),
            vitals_interval: Duration::from_secs(config.ingestion.vitals_interval_seconds),
            motion_interval: Duration::from_secs(config.ingestion.motion_interval_seconds),
            engine: RuleEngine::with_thresholds(&config.thresholds),
            vitals_source,
            motion_source,
            channel,
            store,
            history: Mutex::new(ReadingHistory::new(config.history.capacity)),
            motion_history: Mutex::new(ReadingHistory::new(config.history.capacity)),
            current: Mutex::new(None),
            latest_alerts: Mutex::new(Vec::new()),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    pub fn channel(&self) -> &Arc<BroadcastChannel> {
        &self.channel
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Copy of the rolling vitals history
    pub fn history(&self) -> ReadingHistory {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of the rolling motion history, one entry per fast tick
    pub fn motion_history(&self) -> ReadingHistory {
        self.motion_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reading most recently published with vitals, if any
    pub fn current_reading(&self) -> Option<Reading> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Alerts derived from the most recent reading with vitals
    pub fn latest_alerts(&self) -> Vec<Alert> {
        self.latest_alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one slow tick: fetch, persist, evaluate and publish
    ///
    /// Returns the alerts published for this reading. A reading without any
    /// headline vital is forwarded but leaves the alert state untouched.
    pub async fn vitals_cycle(&self) -> Vec<Alert> {
        let sourced = self.vitals_source.next_reading().await;
        self.stats.record_reading(sourced.origin);
        let reading = sourced.reading;

        if !reading.has_vitals() {
            debug!("Reading at {} carries no vitals", reading.timestamp);
            self.publish(ChannelEvent::ReadingUpdate(reading));
            return self.latest_alerts();
        }

        self.persist(&reading);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(reading.clone());

        let alerts = self.evaluate(&reading);
        *self
            .latest_alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = alerts.clone();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(reading.clone());

        self.publish(ChannelEvent::ReadingUpdate(reading));
        self.publish(ChannelEvent::AlertState(alerts.clone()));
        alerts
    }

    /// Run one fast tick: fetch motion data, chart it and forward it
    ///
    /// Once a vitals reading exists, the motion snapshot is merged into it so
    /// viewers keep seeing the latest vitals between slow ticks.
    pub async fn motion_cycle(&self) {
        let sourced = self.motion_source.next_reading().await;
        self.stats.record_reading(sourced.origin);
        let motion = sourced.reading;

        self.motion_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(motion.clone());

        let update = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            match current.take() {
                Some(reading) => {
                    let merged = reading.with_motion(motion.gyroscope, motion.accelerometer);
                    *current = Some(merged.clone());
                    merged
                }
                None => motion,
            }
        };
        self.publish(ChannelEvent::ReadingUpdate(update));
    }

    /// Drive both timers until the shutdown signal flips to `true`
    ///
    /// Each timer runs in its own loop, so a pending vitals fetch does not
    /// hold back motion updates. Shutdown interrupts an in-flight fetch.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(
            "Monitoring subject {} (vitals every {:?}, motion every {:?})",
            self.subject_id, self.vitals_interval, self.motion_interval
        );

        tokio::join!(
            drive(self.vitals_interval, shutdown.clone(), move || async move {
                let alerts = self.vitals_cycle().await;
                if !alerts.is_empty() {
                    info!("{} active health alerts", alerts.len());
                }
            }),
            drive(self.motion_interval, shutdown, move || self.motion_cycle()),
        );

        info!("Monitor stopped");
        self.stats.log_summary();
    }

    fn evaluate(&self, reading: &Reading) -> Vec<Alert> {
        let timer = EvaluationTimer::start(Arc::clone(&self.stats));
        let alerts = self.engine.evaluate(reading);
        timer.finish();

        self.stats.record_alerts(alerts.len());
        alerts
    }

    fn persist(&self, reading: &Reading) {
        if let Err(e) = self.store.insert(&self.subject_id, reading.clone()) {
            warn!("Failed to store reading at {}: {}", reading.timestamp, e);
            self.stats.record_store_failure();
        }
    }

    fn publish(&self, event: ChannelEvent) {
        let report = self.channel.publish(event);
        self.stats.record_publish(report);
    }
}

/// Run `cycle` on every tick of `period` until shutdown is requested
async fn drive<F, Fut>(period: Duration, mut shutdown: watch::Receiver<bool>, mut cycle: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
        tokio::select! {
            _ = cycle() => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
    }
}

/// Resolve once the shutdown flag is `true` or its sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stopping = *shutdown.borrow_and_update();
        if stopping {
            return;
        }
        if shutdown.changed().await.is_err() {
            warn!("Shutdown sender dropped, stopping monitor");
            return;
        }
    }
}

fn http_source(
    url: Option<&str>,
    timeout: Duration,
) -> Result<Option<Box<dyn ReadingSource>>, IngestError> {
    match url {
        Some(url) => {
            let source = HttpReadingSource::new(url.to_string(), timeout)?;
            Ok(Some(Box::new(source)))
        }
        None => Ok(None),
    }
}
