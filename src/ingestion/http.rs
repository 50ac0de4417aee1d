use crate::error::IngestError;
use crate::events::Reading;
use crate::ingestion::{FetchFuture, ReadingSource};
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// Live feed that fetches one reading per request as JSON
///
/// The body is decoded leniently: numeric strings are accepted and a single
/// malformed vital is dropped instead of failing the reading.
pub struct HttpReadingSource {
    client: Client,
    url: String,
}

impl HttpReadingSource {
    /// Create a new HTTP reading source
    ///
    /// # Arguments
    /// * `url` - Endpoint returning a reading as JSON
    /// * `timeout` - Upper bound on a single request
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use vitalwatch::ingestion::HttpReadingSource;
    ///
    /// let source = HttpReadingSource::new(
    ///     "http://localhost:5000/api/health/latest".to_string(),
    ///     Duration::from_secs(5),
    /// ).unwrap();
    /// ```
    pub fn new(url: String, timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decode a response body into a reading
    pub fn parse_body(body: &str) -> Result<Reading, IngestError> {
        serde_json::from_str(body).map_err(|e| IngestError::ParseError(e.to_string()))
    }
}

impl ReadingSource for HttpReadingSource {
    fn fetch<'a>(&'a self) -> FetchFuture<'a> {
        Box::pin(async move {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                if e.is_timeout() {
                    IngestError::Timeout
                } else {
                    IngestError::RequestFailed(format!("{}: {}", self.url, e))
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(IngestError::BadStatus(status.as_u16()));
            }

            let body = response.text().await?;
            let reading = Self::parse_body(&body)?;
            debug!("Fetched reading at {} from {}", reading.timestamp, self.url);
            Ok(reading)
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
