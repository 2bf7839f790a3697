//! Types for discovery passes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::feed::FeedError;
use crate::metadata::LookupError;
use crate::store::StoreError;
use crate::torrent_client::TorrentClientError;

/// Errors that end a show's discovery early.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The show's configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Series metadata could not be resolved.
    #[error("metadata lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// A feed page could not be fetched.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// The torrent client is unreachable. Aborts the whole pass.
    #[error("torrent client unavailable: {0}")]
    DaemonUnavailable(TorrentClientError),

    /// The torrent client rejected a request.
    #[error("torrent client error: {0}")]
    Daemon(TorrentClientError),

    /// The client already had the transfer and it could not be resolved.
    #[error("duplicate transfer {handle} could not be resolved: {source}")]
    DuplicateTransfer {
        handle: String,
        #[source]
        source: TorrentClientError,
    },

    #[error("episode store error: {0}")]
    Store(#[from] StoreError),
}

impl PlannerError {
    /// Whether the rest of the pass must be skipped.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, PlannerError::DaemonUnavailable(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "config",
            PlannerError::Lookup(_) => "lookup",
            PlannerError::Feed(_) => "feed",
            PlannerError::DaemonUnavailable(_) => "daemon_unavailable",
            PlannerError::Daemon(_) => "daemon",
            PlannerError::DuplicateTransfer { .. } => "duplicate_transfer",
            PlannerError::Store(_) => "store",
        }
    }
}

impl From<TorrentClientError> for PlannerError {
    fn from(e: TorrentClientError) -> Self {
        if e.is_unavailable() {
            PlannerError::DaemonUnavailable(e)
        } else {
            PlannerError::Daemon(e)
        }
    }
}

/// Why a feed item was not submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Summary lacks a usable season or episode.
    Malformed,
    /// Below the configured season/episode floor.
    BelowFloor,
    /// Already recorded for this show.
    AlreadyTracked,
    /// Payload could not be fetched or decoded.
    Payload,
    /// Primary file has an excluded extension.
    ExcludedExtension,
    /// The torrent client refused the metainfo.
    Rejected,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Malformed => "malformed",
            SkipReason::BelowFloor => "below_floor",
            SkipReason::AlreadyTracked => "already_tracked",
            SkipReason::Payload => "payload",
            SkipReason::ExcludedExtension => "excluded_extension",
            SkipReason::Rejected => "rejected",
        }
    }
}

/// Skipped feed items by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub malformed: usize,
    pub below_floor: usize,
    pub already_tracked: usize,
    pub payload: usize,
    pub excluded_extension: usize,
    pub rejected: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::Malformed => &mut self.malformed,
            SkipReason::BelowFloor => &mut self.below_floor,
            SkipReason::AlreadyTracked => &mut self.already_tracked,
            SkipReason::Payload => &mut self.payload,
            SkipReason::ExcludedExtension => &mut self.excluded_extension,
            SkipReason::Rejected => &mut self.rejected,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.malformed
            + self.below_floor
            + self.already_tracked
            + self.payload
            + self.excluded_extension
            + self.rejected
    }
}

/// An episode submitted during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedEpisode {
    pub id: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub handle: String,
    /// The client already had the transfer; it was resumed instead of added.
    pub resumed_duplicate: bool,
}

/// Outcome of one show's discovery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShowDiscovery {
    pub show: String,
    pub submitted: Vec<SubmittedEpisode>,
    pub skipped: SkipCounts,
    /// The show hit its concurrency limit during the pass.
    pub capped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShowDiscovery {
    pub fn new(show: impl Into<String>) -> Self {
        Self {
            show: show.into(),
            ..Default::default()
        }
    }
}

/// Report of one discovery pass.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub shows: Vec<ShowDiscovery>,
    /// Set when the pass stopped early because the torrent client was
    /// unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl DiscoveryReport {
    pub fn submitted_count(&self) -> usize {
        self.shows.iter().map(|s| s.submitted.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.shows.iter().filter(|s| s.error.is_some()).count()
    }
}
