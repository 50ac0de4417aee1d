/// Alert aggregation, dismissal and category filtering
pub mod alert_aggregator;
pub mod dismissal;

pub use alert_aggregator::{filter, merge, standing_notifications, AlertAggregator};
pub use dismissal::{CategoryFilter, DismissalSet};
