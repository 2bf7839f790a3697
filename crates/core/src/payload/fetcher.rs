//! HTTP payload fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Errors fetching or decoding a payload. Always item-level: the planner
/// skips the item and continues.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("HTTP error fetching payload: {0}")]
    Http(String),

    #[error("Payload request returned HTTP {0}")]
    Status(u16),

    #[error("Payload request timed out")]
    Timeout,

    #[error("Failed to decode payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for PayloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PayloadError::Timeout
        } else {
            PayloadError::Http(e.to_string())
        }
    }
}

/// Retrieves the bytes a feed item links to.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PayloadError>;
}

/// Fetches payloads over HTTP(S).
pub struct HttpPayloadFetcher {
    client: Client,
}

impl HttpPayloadFetcher {
    pub fn new(timeout_secs: u32) -> Result<Self, PayloadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PayloadFetcher for HttpPayloadFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PayloadError> {
        debug!(url = %url, "Fetching payload");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PayloadError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fetcher() {
        assert!(HttpPayloadFetcher::new(10).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let fetcher = HttpPayloadFetcher::new(2).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:1/never.torrent").await;
        assert!(matches!(
            result,
            Err(PayloadError::Http(_)) | Err(PayloadError::Timeout)
        ));
    }
}
