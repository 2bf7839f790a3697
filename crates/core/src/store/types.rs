//! Episode record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked episode.
///
/// Status only ever advances `Incomplete -> Seeding -> Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    /// Submitted to the daemon, still downloading.
    Incomplete,
    /// Download finished and file placed; sharing until the seed ratio is met.
    Seeding,
    /// Seed ratio met; terminal.
    Complete,
}

impl EpisodeStatus {
    pub const ALL: [EpisodeStatus; 3] = [
        EpisodeStatus::Incomplete,
        EpisodeStatus::Seeding,
        EpisodeStatus::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeStatus::Incomplete => "incomplete",
            EpisodeStatus::Seeding => "seeding",
            EpisodeStatus::Complete => "complete",
        }
    }

    /// Whether `next` is the single legal step after `self`.
    pub fn can_advance_to(&self, next: EpisodeStatus) -> bool {
        matches!(
            (self, next),
            (EpisodeStatus::Incomplete, EpisodeStatus::Seeding)
                | (EpisodeStatus::Seeding, EpisodeStatus::Complete)
        )
    }
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpisodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(EpisodeStatus::Incomplete),
            "seeding" => Ok(EpisodeStatus::Seeding),
            "complete" => Ok(EpisodeStatus::Complete),
            other => Err(format!("unknown episode status: {}", other)),
        }
    }
}

/// Persisted state for one show/season/episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: String,
    pub show_key: String,
    pub series_name: String,
    pub season: u32,
    pub episode: u32,
    /// Empty when the title is unknown.
    pub title: String,
    pub status: EpisodeStatus,
    pub source_url: String,
    /// Daemon handle (info-hash, lowercase hex).
    pub transfer_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Transfer artifacts still need removing.
    pub cleanup_pending: bool,
    pub cleanup_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cleanup_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl EpisodeRecord {
    /// Whether a pending cleanup may run at `now`.
    pub fn cleanup_due(&self, now: DateTime<Utc>) -> bool {
        self.cleanup_pending && self.next_cleanup_at.is_none_or(|at| at <= now)
    }
}

/// Request to track a newly submitted episode.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub show_key: String,
    pub series_name: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub source_url: String,
    pub transfer_handle: String,
}

/// Filter for querying episode records.
#[derive(Debug, Clone)]
pub struct EpisodeFilter {
    pub show_key: Option<String>,
    pub status: Option<EpisodeStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for EpisodeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeFilter {
    pub fn new() -> Self {
        Self {
            show_key: None,
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_show(mut self, show_key: impl Into<String>) -> Self {
        self.show_key = Some(show_key.into());
        self
    }

    pub fn with_status(mut self, status: EpisodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}
