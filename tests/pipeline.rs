//! End-to-end pipeline tests: source, rules, broadcast and viewers together

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use vitalwatch::aggregator::CategoryFilter;
use vitalwatch::broadcast::{BroadcastChannel, ChannelEvent, ViewerSession};
use vitalwatch::config::Config;
use vitalwatch::events::{AlertCategory, AlertType, BloodPressure, Reading};
use vitalwatch::ingestion::{FallbackSource, MockReadingSource, SyntheticReadingSource};
use vitalwatch::monitor::Monitor;
use vitalwatch::store::{MemoryReadingStore, ReadingStore};

fn scenario_reading() -> Reading {
    Reading::vitals(
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        105.0,
        BloodPressure::new(150.0, 95.0),
        130.0,
        92.0,
    )
}

fn monitor(primary: MockReadingSource, store: Arc<MemoryReadingStore>) -> Monitor {
    Monitor::with_sources(
        &Config::default(),
        FallbackSource::new(Some(Box::new(primary)), SyntheticReadingSource::seeded(10)),
        FallbackSource::new(None, SyntheticReadingSource::seeded(20).motion_only()),
        Arc::new(BroadcastChannel::new()),
        store,
    )
}

#[tokio::test]
async fn critical_reading_reaches_every_viewer() {
    let store = Arc::new(MemoryReadingStore::new());
    let monitor = monitor(MockReadingSource::success(scenario_reading()), store.clone());
    let mut nurse = ViewerSession::connect(monitor.channel(), true);
    let mut doctor = ViewerSession::connect(monitor.channel(), false);

    monitor.vitals_cycle().await;
    assert_eq!(nurse.drain(), 2);
    assert_eq!(doctor.drain(), 2);

    let health = doctor.view(CategoryFilter::Only(AlertCategory::Health));
    let summary: Vec<(&str, AlertType, &str)> = health
        .iter()
        .map(|a| (a.metric.as_str(), a.alert_type, a.threshold.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("heartRate", AlertType::Danger, "100 BPM"),
            ("bloodPressure", AlertType::Danger, "140/90 mmHg"),
            ("bloodSugar", AlertType::Warning, "120 mg/dL"),
            ("spO2", AlertType::Warning, "95%"),
        ]
    );

    // Live alerts first, then the standing notifications
    let nurse_ids: Vec<String> = nurse
        .view(CategoryFilter::All)
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(nurse_ids.len(), 7);
    assert_eq!(
        &nurse_ids[4..],
        &["medication-reminder", "system-update", "exercise-goal"]
    );

    let stored = store.latest("patient-1").unwrap().unwrap();
    assert_eq!(stored, scenario_reading());
}

#[tokio::test]
async fn dismissal_stays_with_one_viewer() {
    let store = Arc::new(MemoryReadingStore::new());
    let monitor = monitor(MockReadingSource::success(scenario_reading()), store);
    let mut first = ViewerSession::connect(monitor.channel(), false);
    let mut second = ViewerSession::connect(monitor.channel(), false);

    let alerts = monitor.vitals_cycle().await;
    first.drain();
    second.drain();

    let heart_rate_id = alerts[0].id.clone();
    first.dismiss(&heart_rate_id);
    first.dismiss(&heart_rate_id);
    first.dismiss("no-such-alert");

    assert_eq!(first.count(CategoryFilter::All), 3);
    assert_eq!(second.count(CategoryFilter::All), 4);
    assert_eq!(monitor.latest_alerts().len(), 4);
}

#[tokio::test]
async fn outage_falls_back_and_recovers() {
    let recovered = Reading {
        timestamp: scenario_reading().timestamp + Duration::seconds(20),
        ..scenario_reading()
    };
    let source = MockReadingSource::with_responses(vec![
        Err("503 from feed".to_string()),
        Ok(recovered),
    ]);
    let store = Arc::new(MemoryReadingStore::new());
    let monitor = monitor(source, store.clone());
    let mut viewer = ViewerSession::connect(monitor.channel(), false);

    let during_outage = monitor.vitals_cycle().await;
    assert!(during_outage.is_empty());
    viewer.drain();
    let fallback = viewer.latest_reading().unwrap().clone();
    assert!((60.0..=90.0).contains(&fallback.heart_rate.unwrap()));
    assert!((95.0..=100.0).contains(&fallback.spo2.unwrap()));
    assert_eq!(viewer.count(CategoryFilter::All), 0);

    let after = monitor.vitals_cycle().await;
    assert_eq!(after.len(), 4);
    viewer.drain();
    assert_eq!(viewer.count(CategoryFilter::All), 4);

    let snapshot = monitor.stats().snapshot();
    assert_eq!(snapshot.fallback_readings, 1);
    assert_eq!(snapshot.live_readings, 1);
    assert_eq!(store.recent("patient-1", 10).unwrap().len(), 2);
}

#[tokio::test]
async fn disconnected_viewer_does_not_disturb_others() {
    let store = Arc::new(MemoryReadingStore::new());
    let monitor = monitor(MockReadingSource::success(scenario_reading()), store);
    let leaving = ViewerSession::connect(monitor.channel(), false);
    let mut staying = ViewerSession::connect(monitor.channel(), false);
    drop(leaving);

    monitor.motion_cycle().await;
    monitor.vitals_cycle().await;

    let mut events = Vec::new();
    for _ in 0..3 {
        events.push(staying.recv().await.unwrap());
    }
    assert_eq!(staying.drain(), 0);
    assert!(matches!(events[0], ChannelEvent::ReadingUpdate(ref r) if !r.has_vitals()));
    assert!(matches!(events[1], ChannelEvent::ReadingUpdate(ref r) if r.has_vitals()));
    assert!(matches!(events[2], ChannelEvent::AlertState(ref a) if a.len() == 4));

    assert_eq!(monitor.channel().subscriber_count(), 1);
    assert_eq!(monitor.stats().snapshot().subscribers_dropped, 1);
}
