use crate::aggregator::{AlertAggregator, CategoryFilter};
use crate::broadcast::{BroadcastChannel, ChannelEvent, Subscriber, SubscriberId};
use crate::events::{Alert, Reading};
use log::debug;
use std::sync::Arc;

/// One connected observer
///
/// Owns its subscription and its own alert aggregator, so dismissing an
/// alert only changes this viewer's view.
pub struct ViewerSession {
    channel: Arc<BroadcastChannel>,
    subscriber: Subscriber,
    aggregator: AlertAggregator,
    latest_reading: Option<Reading>,
}

impl ViewerSession {
    /// Subscribe a new viewer to the channel
    ///
    /// # Arguments
    ///
    /// * `channel` - Channel to receive events from
    /// * `standing_notifications` - Seed the viewer with the standard reminder
    ///   and system notifications
    pub fn connect(channel: &Arc<BroadcastChannel>, standing_notifications: bool) -> Self {
        let aggregator = if standing_notifications {
            AlertAggregator::with_default_standing()
        } else {
            AlertAggregator::new()
        };

        Self {
            channel: Arc::clone(channel),
            subscriber: channel.subscribe(),
            aggregator,
            latest_reading: None,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Wait for the next event and apply it to this viewer's state
    ///
    /// Returns `None` once the viewer has been disconnected and its queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        let event = self.subscriber.recv().await?;
        self.apply(&event);
        Some(event)
    }

    /// Apply every event already queued, returning how many were applied
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscriber.try_recv() {
            self.apply(&event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::ReadingUpdate(reading) => {
                self.latest_reading = Some(reading.clone());
            }
            ChannelEvent::AlertState(alerts) => {
                debug!("Viewer {} received {} live alerts", self.id(), alerts.len());
                self.aggregator.set_live(alerts.clone());
            }
        }
    }

    /// Visible alerts for a category
    pub fn view(&self, category: CategoryFilter) -> Vec<Alert> {
        self.aggregator.view(category)
    }

    pub fn count(&self, category: CategoryFilter) -> usize {
        self.aggregator.count(category)
    }

    /// Hide an alert for this viewer only
    pub fn dismiss(&mut self, id: &str) {
        self.aggregator.dismiss(id);
    }

    /// Most recent reading received, if any
    pub fn latest_reading(&self) -> Option<&Reading> {
        self.latest_reading.as_ref()
    }

    pub fn aggregator(&self) -> &AlertAggregator {
        &self.aggregator
    }

    /// Leave the channel; no further events are delivered
    pub fn disconnect(self) {
        self.channel.unsubscribe(self.subscriber.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AlertCategory, AlertType, Priority};
    use chrono::Utc;

    fn danger(id: &str) -> Alert {
        Alert::new(id, AlertType::Danger, "heartRate", "High Heart Rate Alert!")
            .with_priority(Priority::High)
    }

    #[tokio::test]
    async fn test_viewer_applies_events() {
        let channel = Arc::new(BroadcastChannel::new());
        let mut viewer = ViewerSession::connect(&channel, false);

        let reading = Reading {
            heart_rate: Some(105.0),
            ..Reading::empty(Utc::now())
        };
        channel.publish(ChannelEvent::ReadingUpdate(reading.clone()));
        channel.publish(ChannelEvent::AlertState(vec![danger("hr-1")]));

        assert!(matches!(
            viewer.recv().await,
            Some(ChannelEvent::ReadingUpdate(_))
        ));
        assert_eq!(viewer.latest_reading(), Some(&reading));

        viewer.recv().await.unwrap();
        assert_eq!(viewer.count(CategoryFilter::All), 1);
    }

    #[tokio::test]
    async fn test_dismissal_is_per_viewer() {
        let channel = Arc::new(BroadcastChannel::new());
        let mut first = ViewerSession::connect(&channel, true);
        let mut second = ViewerSession::connect(&channel, true);

        channel.publish(ChannelEvent::AlertState(vec![danger("hr-1")]));
        first.drain();
        second.drain();

        first.dismiss("hr-1");
        first.dismiss("system-update");

        assert_eq!(first.count(CategoryFilter::All), 2);
        assert_eq!(second.count(CategoryFilter::All), 4);
        assert_eq!(
            second.count(CategoryFilter::Only(AlertCategory::System)),
            1
        );
    }

    #[tokio::test]
    async fn test_new_alert_state_keeps_dismissals() {
        let channel = Arc::new(BroadcastChannel::new());
        let mut viewer = ViewerSession::connect(&channel, false);

        channel.publish(ChannelEvent::AlertState(vec![danger("hr-1")]));
        viewer.drain();
        viewer.dismiss("hr-1");

        channel.publish(ChannelEvent::AlertState(vec![danger("hr-1"), danger("hr-2")]));
        assert_eq!(viewer.drain(), 1);

        let ids: Vec<String> = viewer
            .view(CategoryFilter::All)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["hr-2".to_string()]);
        assert!(viewer.aggregator().is_dismissed("hr-1"));
    }

    #[tokio::test]
    async fn test_disconnect_leaves_others_connected() {
        let channel = Arc::new(BroadcastChannel::new());
        let leaving = ViewerSession::connect(&channel, false);
        let mut staying = ViewerSession::connect(&channel, false);
        assert_ne!(leaving.id(), staying.id());
        assert_eq!(channel.subscriber_count(), 2);

        leaving.disconnect();
        assert_eq!(channel.subscriber_count(), 1);

        let report = channel.publish(ChannelEvent::AlertState(vec![danger("hr-9")]));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 0);
        assert_eq!(staying.drain(), 1);
    }
}
