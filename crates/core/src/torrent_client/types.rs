//! Types for torrent client operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    /// The daemon already has this torrent. `existing_hash` is set when the
    /// daemon reports which transfer it is.
    #[error("Torrent already added{}", .existing_hash.as_deref().map(|h| format!(": {}", h)).unwrap_or_default())]
    Duplicate { existing_hash: Option<String> },

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TorrentClientError {
    /// Whether the daemon itself could not be reached; the whole pass should
    /// stop and retry on the next tick.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            TorrentClientError::ConnectionFailed(_)
                | TorrentClientError::AuthenticationFailed(_)
                | TorrentClientError::Timeout
        )
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TorrentClientError::Timeout
        } else if e.is_connect() {
            TorrentClientError::ConnectionFailed(e.to_string())
        } else {
            TorrentClientError::ApiError(e.to_string())
        }
    }
}

/// State of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Downloading from peers.
    Downloading,
    /// Seeding to peers.
    Seeding,
    /// Download or upload is paused/stopped.
    Paused,
    /// Checking file integrity.
    Checking,
    /// Queued for download or seeding.
    Queued,
    /// Stalled (no peers).
    Stalled,
    /// Error state.
    Error,
    /// Unknown state.
    Unknown,
}

impl TorrentState {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Paused => "paused",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Stalled => "stalled",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }

    /// Whether the transfer is stopped and needs an explicit resume.
    pub fn is_stopped(&self) -> bool {
        matches!(self, TorrentState::Paused)
    }
}

/// A file inside a torrent as the daemon reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent's save path.
    pub path: String,
    pub size_bytes: u64,
}

/// Information about a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Uploaded bytes.
    pub uploaded_bytes: u64,
    /// Ratio (uploaded/downloaded).
    pub ratio: f64,
    /// Directory the files are saved under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
    /// Files in the torrent.
    #[serde(default)]
    pub files: Vec<TorrentFile>,
}

impl TorrentInfo {
    /// Whether every piece has been downloaded.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// The largest file, which for an episode release is the video itself.
    pub fn largest_file(&self) -> Option<&TorrentFile> {
        self.files.iter().max_by_key(|f| f.size_bytes)
    }
}

/// Request to add a new torrent from .torrent file contents.
#[derive(Debug, Clone)]
pub struct AddTorrentRequest {
    /// Raw .torrent file bytes.
    pub data: Vec<u8>,
    /// Original filename (for logging and multipart uploads).
    pub filename: Option<String>,
    /// Optional download path override.
    pub download_path: Option<String>,
    /// Start paused.
    pub paused: bool,
}

impl AddTorrentRequest {
    /// Create a torrent file request with default options.
    pub fn torrent_file(data: Vec<u8>) -> Self {
        Self {
            data,
            filename: None,
            download_path: None,
            paused: false,
        }
    }

    /// Set the original filename.
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    /// Set the download path.
    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        self.download_path = Some(path.into());
        self
    }

    /// Set whether to start paused.
    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// Result of adding a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrentResult {
    /// Info hash of the added torrent (lowercase hex).
    pub hash: String,
    /// Name of the torrent, when the daemon reports it.
    pub name: Option<String>,
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Add a new torrent.
    ///
    /// Returns [`TorrentClientError::Duplicate`] when the daemon already has it.
    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError>;

    /// Get a specific torrent by hash.
    ///
    /// Returns [`TorrentClientError::TorrentNotFound`] for unknown handles.
    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError>;

    /// Remove a torrent.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove_torrent(&self, hash: &str, delete_files: bool)
        -> Result<(), TorrentClientError>;

    /// Pause a torrent.
    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Resume a paused torrent.
    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with_files(files: &[(&str, u64)]) -> TorrentInfo {
        TorrentInfo {
            hash: "abc123".to_string(),
            name: "Show.S01E01".to_string(),
            state: TorrentState::Downloading,
            progress: 0.5,
            size_bytes: files.iter().map(|(_, s)| s).sum(),
            uploaded_bytes: 0,
            ratio: 0.0,
            save_path: Some("/downloads".to_string()),
            files: files
                .iter()
                .map(|(p, s)| TorrentFile {
                    path: p.to_string(),
                    size_bytes: *s,
                })
                .collect(),
        }
    }

    #[test]
    fn test_torrent_state_as_str() {
        assert_eq!(TorrentState::Downloading.as_str(), "downloading");
        assert_eq!(TorrentState::Seeding.as_str(), "seeding");
        assert_eq!(TorrentState::Paused.as_str(), "paused");
        assert_eq!(TorrentState::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_torrent_state_serialization() {
        assert_eq!(
            serde_json::to_string(&TorrentState::Downloading).unwrap(),
            "\"downloading\""
        );
        assert!(TorrentState::Paused.is_stopped());
        assert!(!TorrentState::Queued.is_stopped());
    }

    #[test]
    fn test_largest_file() {
        let info = info_with_files(&[
            ("Show.S01E01/sample.mkv", 10),
            ("Show.S01E01/Show.S01E01.mkv", 1000),
            ("Show.S01E01/info.nfo", 1),
        ]);
        assert_eq!(info.largest_file().unwrap().path, "Show.S01E01/Show.S01E01.mkv");
        assert!(info_with_files(&[]).largest_file().is_none());
    }

    #[test]
    fn test_is_complete() {
        let mut info = info_with_files(&[("a.mkv", 1)]);
        assert!(!info.is_complete());
        info.progress = 1.0;
        assert!(info.is_complete());
    }

    #[test]
    fn test_add_torrent_request_builder() {
        let req = AddTorrentRequest::torrent_file(vec![0u8; 100])
            .with_filename("show.torrent")
            .with_download_path("/downloads")
            .with_paused(true);

        assert_eq!(req.data.len(), 100);
        assert_eq!(req.filename.as_deref(), Some("show.torrent"));
        assert_eq!(req.download_path.as_deref(), Some("/downloads"));
        assert!(req.paused);
    }

    #[test]
    fn test_error_classification() {
        assert!(TorrentClientError::Timeout.is_unavailable());
        assert!(TorrentClientError::ConnectionFailed("refused".into()).is_unavailable());
        assert!(TorrentClientError::AuthenticationFailed("bad".into()).is_unavailable());
        assert!(!TorrentClientError::TorrentNotFound("x".into()).is_unavailable());
        assert!(!TorrentClientError::Duplicate { existing_hash: None }.is_unavailable());
    }

    #[test]
    fn test_duplicate_display() {
        let with_hash = TorrentClientError::Duplicate {
            existing_hash: Some("abcd".to_string()),
        };
        assert_eq!(with_hash.to_string(), "Torrent already added: abcd");
        let without = TorrentClientError::Duplicate { existing_hash: None };
        assert_eq!(without.to_string(), "Torrent already added");
    }
}
