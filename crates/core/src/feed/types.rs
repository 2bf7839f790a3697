//! Types shared by feed sources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One item of a feed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Link to the .torrent payload.
    pub link: String,
    /// Free-text `Key: Value; ...` summary describing the episode.
    pub summary: String,
}

impl FeedEntry {
    pub fn new(link: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            summary: summary.into(),
        }
    }
}

/// Errors that can occur when fetching a feed page.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Http(String),

    #[error("Feed returned HTTP {0}")]
    Status(u16),

    #[error("Feed request timed out")]
    Timeout,

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else {
            FeedError::Http(e.to_string())
        }
    }
}

/// Source of episode feed pages, queried per show and season.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch the entries for one season of a show, in feed order.
    async fn fetch(
        &self,
        show_query: &str,
        quality: &str,
        season: u32,
    ) -> Result<Vec<FeedEntry>, FeedError>;
}
