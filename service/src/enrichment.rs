// Annotation lookup for processed records.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("annotation request timed out")]
    Timeout,
    #[error("could not connect to annotation service: {0}")]
    Connect(String),
    #[error("annotation service answered with status {0}")]
    Status(u16),
    #[error("failed to read annotation body: {0}")]
    Body(String),
    #[error("annotation request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EnrichmentError::Timeout
        } else if e.is_connect() {
            EnrichmentError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            EnrichmentError::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            EnrichmentError::Body(e.to_string())
        } else {
            EnrichmentError::Request(e.to_string())
        }
    }
}

/// Source of the `note` attached to every output record.
#[async_trait]
pub trait NoteSource: Send + Sync {
    async fn fetch_note(&self) -> Result<String, EnrichmentError>;
}

/// Fetches notes with a plain HTTP GET; the response body is the note.
pub struct HttpNoteSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNoteSource {
    /// `timeout` bounds the whole request, body included.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        Self::from_builder(reqwest::Client::builder(), endpoint, timeout)
    }

    pub fn from_builder(
        builder: reqwest::ClientBuilder,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EnrichmentError> {
        let client = builder
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl NoteSource for HttpNoteSource {
    async fn fetch_note(&self) -> Result<String, EnrichmentError> {
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }

        let note = response.text().await?;
        debug!("Fetched note ({} bytes) from {}", note.len(), self.endpoint);
        Ok(note)
    }
}
