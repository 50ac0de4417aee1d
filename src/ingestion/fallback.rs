use crate::events::Reading;
use crate::ingestion::{FetchFuture, ReadingSource, SyntheticReadingSource};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Where a reading handed to the pipeline came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingOrigin {
    Live,
    Fallback,
}

/// A reading together with its origin
#[derive(Debug, Clone)]
pub struct SourcedReading {
    pub reading: Reading,
    pub origin: ReadingOrigin,
}

/// Source that never fails
///
/// Tries the primary source first and substitutes a synthetic reading on any
/// error. Without a primary every reading is synthetic.
pub struct FallbackSource {
    primary: Option<Box<dyn ReadingSource>>,
    fallback: SyntheticReadingSource,
    live_count: AtomicU64,
    fallback_count: AtomicU64,
}

impl FallbackSource {
    /// Create a fallback source
    ///
    /// # Arguments
    ///
    /// * `primary` - Live source to try first, if any
    /// * `fallback` - Generator used whenever the primary fails or is absent
    pub fn new(primary: Option<Box<dyn ReadingSource>>, fallback: SyntheticReadingSource) -> Self {
        Self {
            primary,
            fallback,
            live_count: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
        }
    }

    /// Fetch a reading and report whether it is live or synthetic
    pub async fn next_reading(&self) -> SourcedReading {
        if let Some(primary) = &self.primary {
            match primary.fetch().await {
                Ok(reading) => {
                    self.live_count.fetch_add(1, Ordering::Relaxed);
                    return SourcedReading {
                        reading,
                        origin: ReadingOrigin::Live,
                    };
                }
                Err(e) => warn!(
                    "{} source failed, using {} reading: {}",
                    primary.name(),
                    self.fallback.name(),
                    e
                ),
            }
        } else {
            debug!("No live source configured, using {} reading", self.fallback.name());
        }

        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        SourcedReading {
            reading: self.fallback.generate(),
            origin: ReadingOrigin::Fallback,
        }
    }

    /// Number of readings obtained from the primary source
    pub fn live_count(&self) -> u64 {
        self.live_count.load(Ordering::Relaxed)
    }

    /// Number of readings substituted by the generator
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }
}

impl ReadingSource for FallbackSource {
    fn fetch<'a>(&'a self) -> FetchFuture<'a> {
        Box::pin(async move { Ok(self.next_reading().await.reading) })
    }

    fn name(&self) -> &str {
        match &self.primary {
            Some(primary) => primary.name(),
            None => self.fallback.name(),
        }
    }
}
