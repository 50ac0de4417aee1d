//! Reading sources for the monitor
//!
//! A source produces one reading per call. The live HTTP feed can fail at
//! any time, so the monitor always wraps it in a `FallbackSource` that
//! substitutes a synthetic reading instead of surfacing the error.

pub mod fallback;
pub mod http;
pub mod mock;
pub mod synthetic;

pub use fallback::{FallbackSource, ReadingOrigin, SourcedReading};
pub use http::HttpReadingSource;
pub use mock::MockReadingSource;
pub use synthetic::{SyntheticKind, SyntheticReadingSource};

use crate::error::IngestError;
use crate::events::Reading;
use std::future::Future;
use std::pin::Pin;

/// Future returned by `ReadingSource::fetch`
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Reading, IngestError>> + Send + 'a>>;

/// Trait for producers of readings
pub trait ReadingSource: Send + Sync {
    /// Produce the next reading
    fn fetch<'a>(&'a self) -> FetchFuture<'a>;

    /// Short name used in log messages
    fn name(&self) -> &str;
}
