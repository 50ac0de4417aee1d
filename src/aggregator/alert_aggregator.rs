//! Alert aggregation for a single viewer
//!
//! This module provides the AlertAggregator which combines the latest live
//! alerts from the rule engine with standing notifications, hides the ones the
//! viewer dismissed, and filters the result by category.

use crate::aggregator::dismissal::{CategoryFilter, DismissalSet};
use crate::events::{Alert, AlertCategory, AlertType, Priority, Timestamp};
use chrono::Utc;
use log::debug;

/// Merge live alerts with standing alerts, hiding dismissed ids
///
/// Live alerts come first, then standing alerts, each in arrival order.
pub fn merge(live: &[Alert], standing: &[Alert], dismissed: &DismissalSet) -> Vec<Alert> {
    live.iter()
        .chain(standing.iter())
        .filter(|alert| !dismissed.contains(&alert.id))
        .cloned()
        .collect()
}

/// Keep the alerts that pass the category filter, preserving relative order
pub fn filter(alerts: &[Alert], category: CategoryFilter) -> Vec<Alert> {
    alerts
        .iter()
        .filter(|alert| category.matches(alert))
        .cloned()
        .collect()
}

/// Notifications every viewer starts with, independent of readings
pub fn standing_notifications(now: Timestamp) -> Vec<Alert> {
    vec![
        Alert::new(
            "medication-reminder",
            AlertType::Warning,
            "Medication",
            "Scheduled Medication Reminder",
        )
        .with_value("Morning Dose")
        .with_threshold("8:00 AM")
        .with_category(AlertCategory::Reminder)
        .with_priority(Priority::Medium)
        .with_timestamp(now),
        Alert::new(
            "system-update",
            AlertType::Info,
            "System",
            "System Update Available",
        )
        .with_value("v2.1.0")
        .with_threshold("Update Now")
        .with_category(AlertCategory::System)
        .with_priority(Priority::Low)
        .with_timestamp(now),
        Alert::new(
            "exercise-goal",
            AlertType::Success,
            "Exercise",
            "Daily Exercise Goal Achieved!",
        )
        .with_value("30 minutes")
        .with_threshold("Daily Target")
        .with_category(AlertCategory::Health)
        .with_priority(Priority::Medium)
        .with_timestamp(now),
    ]
}

/// Per-viewer alert state
///
/// Holds the most recent live alerts, the standing notifications and the
/// viewer's dismissal set. Every view is computed from these on demand, so
/// counts are never stale.
#[derive(Debug, Clone, Default)]
pub struct AlertAggregator {
    /// Alerts from the latest evaluated reading
    live: Vec<Alert>,
    /// Non-metric notifications, in arrival order
    standing: Vec<Alert>,
    /// Ids hidden by this viewer
    dismissed: DismissalSet,
}

impl AlertAggregator {
    /// Create an aggregator with no alerts
    ///
    /// # Examples
    ///
    /// ```
    /// use vitalwatch::aggregator::{AlertAggregator, CategoryFilter};
    ///
    /// let aggregator = AlertAggregator::new();
    /// assert_eq!(aggregator.count(CategoryFilter::All), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator seeded with the standard standing notifications
    pub fn with_default_standing() -> Self {
        Self {
            standing: standing_notifications(Utc::now()),
            ..Self::default()
        }
    }

    /// Replace the live alerts with the ones derived from a newer reading
    pub fn set_live(&mut self, alerts: Vec<Alert>) {
        self.live = alerts;
    }

    /// Append a standing notification
    pub fn push_standing(&mut self, alert: Alert) {
        self.standing.push(alert);
    }

    /// Hide an alert from this viewer
    ///
    /// Idempotent. Ids that match no current alert are ignored. Upstream
    /// alert state is never touched.
    pub fn dismiss(&mut self, id: &str) {
        let known = self
            .live
            .iter()
            .chain(self.standing.iter())
            .any(|alert| alert.id == id);

        if !known {
            debug!("Ignoring dismissal of unknown alert {}", id);
            return;
        }

        if self.dismissed.insert(id) {
            debug!("Dismissed alert {}", id);
        }
    }

    /// Current visible alerts for a category
    pub fn view(&self, category: CategoryFilter) -> Vec<Alert> {
        filter(&merge(&self.live, &self.standing, &self.dismissed), category)
    }

    /// Number of visible alerts for a category
    pub fn count(&self, category: CategoryFilter) -> usize {
        self.live
            .iter()
            .chain(self.standing.iter())
            .filter(|alert| !self.dismissed.contains(&alert.id) && category.matches(alert))
            .count()
    }

    /// Number of distinct alerts this viewer has dismissed
    pub fn dismissed_count(&self) -> usize {
        self.dismissed.len()
    }

    pub fn is_dismissed(&self, id: &str) -> bool {
        self.dismissed.contains(id)
    }

    /// Live alerts as last set, including dismissed ones
    pub fn live(&self) -> &[Alert] {
        &self.live
    }
}
