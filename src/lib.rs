/// Error types for the vitals monitor
pub mod error;

/// Reading and alert data model
pub mod events;

/// Threshold rules that classify readings into alerts
pub mod rules;

/// Alert merging, dismissal and category filtering
pub mod aggregator;

/// Live and synthetic reading sources
pub mod ingestion;

/// Fan-out of readings and alert state to viewers
pub mod broadcast;

/// Rolling reading history for live charts
pub mod history;

/// Reading persistence
pub mod store;

/// Pipeline counters
pub mod stats;

/// Timer-driven pipeline orchestration
pub mod monitor;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{ConfigError, EvaluationError, IngestError, StoreError};
pub use events::{Alert, Reading};
