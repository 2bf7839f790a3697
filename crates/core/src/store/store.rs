//! Episode storage trait and errors.

use std::fmt;

use chrono::{DateTime, Utc};

use super::{EpisodeFilter, EpisodeRecord, EpisodeStatus, NewEpisode};

/// Error type for episode store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Record not found.
    NotFound(String),
    /// `(show_key, season, episode)` is already tracked.
    AlreadyTracked {
        show_key: String,
        season: u32,
        episode: u32,
    },
    /// Status change that is not a single forward step.
    InvalidTransition {
        id: String,
        from: EpisodeStatus,
        to: EpisodeStatus,
    },
    /// Database error.
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Episode not found: {}", id),
            StoreError::AlreadyTracked {
                show_key,
                season,
                episode,
            } => write!(
                f,
                "Episode already tracked: {} s{:02}e{:02}",
                show_key, season, episode
            ),
            StoreError::InvalidTransition { id, from, to } => write!(
                f,
                "Cannot move episode {} from {} to {}",
                id, from, to
            ),
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for episode storage backends.
pub trait EpisodeStore: Send + Sync {
    /// Track a new episode as `Incomplete`.
    ///
    /// Fails with [`StoreError::AlreadyTracked`] when the show already has a
    /// record for that season and episode.
    fn create(&self, request: NewEpisode) -> Result<EpisodeRecord, StoreError>;

    /// Get a record by ID.
    fn get(&self, id: &str) -> Result<Option<EpisodeRecord>, StoreError>;

    /// Get the record for one episode of a show.
    fn find(
        &self,
        show_key: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeRecord>, StoreError>;

    /// Highest season with any record for the show.
    fn max_season(&self, show_key: &str) -> Result<Option<u32>, StoreError>;

    /// List records matching the filter, ordered by show, season, episode.
    fn list(&self, filter: &EpisodeFilter) -> Result<Vec<EpisodeRecord>, StoreError>;

    /// Count records matching the filter (limit/offset ignored).
    fn count(&self, filter: &EpisodeFilter) -> Result<i64, StoreError>;

    /// Records the monitor must look at: `Incomplete`, `Seeding`, and
    /// `Complete` with a pending cleanup.
    fn active(&self) -> Result<Vec<EpisodeRecord>, StoreError>;

    /// Advance a record by one lifecycle step.
    ///
    /// Advancing to `Complete` also marks the cleanup as pending, in the same
    /// commit.
    fn advance(&self, id: &str, to: EpisodeStatus) -> Result<EpisodeRecord, StoreError>;

    /// Note a failed cleanup attempt and when to retry it.
    fn record_cleanup_failure(
        &self,
        id: &str,
        error: &str,
        retry_at: DateTime<Utc>,
    ) -> Result<EpisodeRecord, StoreError>;

    /// Mark the pending cleanup as done.
    fn clear_cleanup(&self, id: &str) -> Result<EpisodeRecord, StoreError>;

    /// Delete a record. Returns the deleted record.
    fn delete(&self, id: &str) -> Result<EpisodeRecord, StoreError>;

    /// Delete every record of a show. Returns how many were removed.
    fn delete_show(&self, show_key: &str) -> Result<usize, StoreError>;
}
