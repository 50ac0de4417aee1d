use crate::error::IngestError;
use crate::events::Reading;
use crate::ingestion::{FetchFuture, ReadingSource};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Scripted reading source for testing
///
/// Responses are returned in order and cycle after the last one. An `Err`
/// entry is reported as `IngestError::RequestFailed` with that message.
#[derive(Clone)]
pub struct MockReadingSource {
    responses: Vec<Result<Reading, String>>,
    current_index: Arc<Mutex<usize>>,
    delay: Option<Duration>,
    call_count: Arc<Mutex<usize>>,
}

impl MockReadingSource {
    /// Create a mock source with multiple responses
    pub fn with_responses(responses: Vec<Result<Reading, String>>) -> Self {
        Self {
            responses,
            current_index: Arc::new(Mutex::new(0)),
            delay: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a mock source with a single response
    pub fn with_response(response: Result<Reading, String>) -> Self {
        Self::with_responses(vec![response])
    }

    /// Create a mock source that always returns the given reading
    pub fn success(reading: Reading) -> Self {
        Self::with_response(Ok(reading))
    }

    /// Create a mock source that always fails
    pub fn failing(message: &str) -> Self {
        Self::with_response(Err(message.to_string()))
    }

    /// Add a delay to all responses
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times fetch() has been called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the call count and response position
    pub fn reset(&self) {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner) = 0;
        *self.current_index.lock().unwrap_or_else(PoisonError::into_inner) = 0;
    }

    fn next_response(&self) -> Result<Reading, IngestError> {
        if self.responses.is_empty() {
            return Err(IngestError::RequestFailed(
                "mock source has no responses".to_string(),
            ));
        }

        let mut index = self.current_index.lock().unwrap_or_else(PoisonError::into_inner);
        let response = &self.responses[*index % self.responses.len()];
        *index += 1;

        response.clone().map_err(IngestError::RequestFailed)
    }
}

impl ReadingSource for MockReadingSource {
    fn fetch<'a>(&'a self) -> FetchFuture<'a> {
        Box::pin(async move {
            *self.call_count.lock().unwrap_or_else(PoisonError::into_inner) += 1;

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.next_response()
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
