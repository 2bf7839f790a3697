//! Types for metadata lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when looking up series metadata.
///
/// Any of these aborts only the affected show's discovery pass.
#[derive(Debug, Error)]
pub enum LookupError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Series, season or episode not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The series is known but has no regular seasons.
    #[error("Series '{0}' has no seasons")]
    NoSeasons(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// A resolved series, as returned by [`MetadataLookup::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowHandle {
    /// Backend-specific series identifier.
    pub id: String,
    /// Canonical series name.
    pub name: String,
    /// Language used for titles.
    pub language: String,
}

/// Series metadata lookup.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Resolve a series name to a handle.
    async fn resolve(&self, series: &str, language: &str) -> Result<ShowHandle, LookupError>;

    /// Number of regular seasons; specials (season 0) are not counted.
    async fn season_count(&self, show: &ShowHandle) -> Result<u32, LookupError>;

    /// Title of one episode.
    async fn episode_title(
        &self,
        show: &ShowHandle,
        season: u32,
        episode: u32,
    ) -> Result<String, LookupError>;
}
