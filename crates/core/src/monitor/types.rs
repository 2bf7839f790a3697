//! Types for monitor passes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::placer::PlacerError;
use crate::store::StoreError;
use crate::torrent_client::TorrentClientError;

/// Errors raised while driving one record.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The torrent client is unreachable. Aborts the whole pass.
    #[error("torrent client unavailable: {0}")]
    DaemonUnavailable(TorrentClientError),

    #[error("torrent client error: {0}")]
    Daemon(TorrentClientError),

    /// The daemon refused to remove a finished transfer. Aborts the pass;
    /// the cleanup stays pending and is retried later.
    #[error("failed to remove transfer {handle}: {source}")]
    CleanupFailed {
        handle: String,
        #[source]
        source: TorrentClientError,
    },

    /// Placement or cleanup on disk failed; the record keeps its status.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] PlacerError),

    /// The record's show is missing or invalid in the configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transfer lists no files to place.
    #[error("transfer {0} has no files")]
    NoFiles(String),

    #[error("episode store error: {0}")]
    Store(#[from] StoreError),
}

impl MonitorError {
    /// Whether the rest of the pass must be skipped.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::DaemonUnavailable(_) | MonitorError::CleanupFailed { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::DaemonUnavailable(_) => "daemon_unavailable",
            MonitorError::Daemon(_) => "daemon",
            MonitorError::CleanupFailed { .. } => "cleanup_failed",
            MonitorError::Filesystem(_) => "filesystem",
            MonitorError::Config(_) => "config",
            MonitorError::NoFiles(_) => "no_files",
            MonitorError::Store(_) => "store",
        }
    }
}

impl From<TorrentClientError> for MonitorError {
    fn from(e: TorrentClientError) -> Self {
        if e.is_unavailable() {
            MonitorError::DaemonUnavailable(e)
        } else {
            MonitorError::Daemon(e)
        }
    }
}

/// A record that could not be advanced this pass.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub id: String,
    pub show: String,
    pub season: u32,
    pub episode: u32,
    pub error: String,
}

/// Report of one monitor pass.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records examined.
    pub checked: usize,
    /// Files placed at their destination.
    pub placed: usize,
    /// Records moved to `Complete`.
    pub completed: usize,
    /// Transfers fully cleaned up.
    pub cleaned: usize,
    /// Records deleted because their transfer disappeared.
    pub vanished: usize,
    /// Paused transfers resumed.
    pub resumed: usize,
    pub errors: Vec<RecordFailure>,
    /// Set when the pass stopped early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl MonitorReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            checked: 0,
            placed: 0,
            completed: 0,
            cleaned: 0,
            vanished: 0,
            resumed: 0,
            errors: Vec::new(),
            aborted: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_fatal_errors() {
        assert!(MonitorError::from(TorrentClientError::ConnectionFailed("x".into())).is_pass_fatal());
        assert!(MonitorError::CleanupFailed {
            handle: "abc".into(),
            source: TorrentClientError::ApiError("nope".into()),
        }
        .is_pass_fatal());
        assert!(!MonitorError::NoFiles("abc".into()).is_pass_fatal());
        assert!(!MonitorError::from(TorrentClientError::ApiError("x".into())).is_pass_fatal());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(MonitorError::NoFiles("abc".into()).kind(), "no_files");
        assert_eq!(
            MonitorError::from(StoreError::Database("locked".into())).kind(),
            "store"
        );
        assert_eq!(
            MonitorError::from(PlacerError::NoDownloadDir).kind(),
            "filesystem"
        );
    }

    #[test]
    fn test_new_report_is_empty() {
        let report = MonitorReport::new(Utc::now());
        assert_eq!(report.checked, 0);
        assert!(report.errors.is_empty());
        assert!(report.aborted.is_none());
    }
}
