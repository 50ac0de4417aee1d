//! In-process fan-out of readings and alert state
//!
//! Every subscriber owns an unbounded queue, so a slow viewer never delays
//! the publisher or other viewers, and each viewer sees events in publish
//! order.

use crate::events::{Alert, Reading};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Identifier assigned to a subscriber on subscribe
pub type SubscriberId = u64;

/// Event pushed to every subscriber
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChannelEvent {
    /// A reading, forwarded verbatim
    ReadingUpdate(Reading),
    /// Ordered live alerts derived from the latest reading with vitals
    AlertState(Vec<Alert>),
}

impl ChannelEvent {
    /// Serialize to the wire form, e.g. `{"event":"readingUpdate","data":{...}}`
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that received the event
    pub delivered: usize,
    /// Subscribers found disconnected and removed
    pub dropped: usize,
}

/// Receiving end held by one observer
///
/// Dropping it disconnects the observer; the channel notices on the next
/// publish and removes it.
pub struct Subscriber {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event; `None` once unsubscribed and drained
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Registry of connected subscribers
///
/// Thread-safe via an interior `Mutex`; share it with `Arc`.
pub struct BroadcastChannel {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<ChannelEvent>>>,
    next_id: AtomicU64,
}

impl BroadcastChannel {
    /// Create a channel with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber
    ///
    /// The subscriber receives only events published after this call.
    pub fn subscribe(&self) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        debug!("Subscriber {} connected", id);
        Subscriber { id, receiver }
    }

    /// Remove a subscriber; later publishes no longer reach it
    ///
    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!("Subscriber {} disconnected", id);
        }
        removed
    }

    /// Deliver an event to every connected subscriber
    ///
    /// Never blocks and never fails. Subscribers whose receiving end is gone
    /// are removed and counted as dropped.
    pub fn publish(&self, event: ChannelEvent) -> PublishReport {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut report = PublishReport::default();

        subscribers.retain(|id, sender| match sender.send(event.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(_) => {
                warn!("Dropping disconnected subscriber {}", id);
                report.dropped += 1;
                false
            }
        });

        report
    }

    /// Number of currently registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn reading_event(hr: f64) -> ChannelEvent {
        ChannelEvent::ReadingUpdate(Reading {
            heart_rate: Some(hr),
            ..Reading::empty(Utc::now())
        })
    }

    fn heart_rate(event: &ChannelEvent) -> Option<f64> {
        match event {
            ChannelEvent::ReadingUpdate(reading) => reading.heart_rate,
            ChannelEvent::AlertState(_) => None,
        }
    }

    #[tokio::test]
    async fn test_order_preserved_per_subscriber() {
        let channel = BroadcastChannel::new();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        for hr in [70.0, 80.0, 90.0] {
            let report = channel.publish(reading_event(hr));
            assert_eq!(report.delivered, 2);
        }

        for subscriber in [&mut first, &mut second] {
            let mut seen = Vec::new();
            for _ in 0..3 {
                let event = subscriber.recv().await.unwrap();
                seen.push(heart_rate(&event).unwrap());
            }
            assert_eq!(seen, vec![70.0, 80.0, 90.0]);
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let channel = BroadcastChannel::new();
        let mut subscriber = channel.subscribe();
        let id = subscriber.id();

        channel.publish(reading_event(70.0));
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));

        let report = channel.publish(reading_event(80.0));
        assert_eq!(report, PublishReport::default());

        // Already queued events still drain, then the queue reports closed
        assert_eq!(heart_rate(&subscriber.recv().await.unwrap()), Some(70.0));
        assert!(subscriber.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_isolated() {
        let channel = BroadcastChannel::new();
        let gone = channel.subscribe();
        let mut stays = channel.subscribe();
        drop(gone);

        let report = channel.publish(reading_event(75.0));
        assert_eq!(
            report,
            PublishReport {
                delivered: 1,
                dropped: 1
            }
        );
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(heart_rate(&stays.recv().await.unwrap()), Some(75.0));
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let channel = BroadcastChannel::new();
        channel.publish(reading_event(70.0));

        let mut late = channel.subscribe();
        assert!(late.try_recv().is_none());

        channel.publish(reading_event(71.0));
        assert_eq!(heart_rate(&late.try_recv().unwrap()), Some(71.0));
    }

    #[tokio::test]
    async fn test_publish_from_many_tasks() {
        let channel = Arc::new(BroadcastChannel::new());
        let mut subscriber = channel.subscribe();

        let handles: Vec<_> = (0..4)
            .map(|task| {
                let channel = Arc::clone(&channel);
                tokio::spawn(async move {
                    for i in 0..25 {
                        channel.publish(reading_event(f64::from(task * 100 + i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut received = 0;
        while subscriber.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 100);
    }

    #[test]
    fn test_event_wire_format() {
        let event = ChannelEvent::AlertState(Vec::new());
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "alertState");
        assert!(json["data"].as_array().unwrap().is_empty());

        let json: serde_json::Value =
            serde_json::from_str(&reading_event(88.0).to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "readingUpdate");
        assert_eq!(json["data"]["heartRate"], 88.0);
    }
}
