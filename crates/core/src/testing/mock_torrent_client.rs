//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::payload::decode_torrent;
use crate::torrent_client::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentFile,
    TorrentInfo, TorrentState,
};

/// A recorded torrent addition for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAddTorrent {
    /// The request that was made.
    pub request: AddTorrentRequest,
    /// Info hash decoded from the request.
    pub hash: String,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Decode added payloads so handles are real info-hashes
/// - Control transfer progress, ratio and state
/// - Simulate failures and transfers removed behind our back
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
///
/// let added = client.add_torrent(AddTorrentRequest::torrent_file(bytes)).await?;
///
/// // Simulate the download finishing and the seed target being met
/// client.set_progress(&added.hash, 1.0).await;
/// client.set_ratio(&added.hash, 2.0).await;
///
/// assert_eq!(client.removed().await, vec![added.hash]);
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Recorded add_torrent calls.
    added: Arc<RwLock<Vec<RecordedAddTorrent>>>,
    /// Current transfers by hash.
    torrents: Arc<RwLock<HashMap<String, TorrentInfo>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// If set, every remove fails with an API error carrying this message.
    remove_failure: Arc<RwLock<Option<String>>>,
    /// Whether duplicate errors report the existing hash.
    report_duplicate_hash: Arc<RwLock<bool>>,
    resumed: Arc<RwLock<Vec<String>>>,
    paused: Arc<RwLock<Vec<String>>>,
    removed: Arc<RwLock<Vec<String>>>,
    /// Default save path for new transfers.
    default_save_path: String,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self {
            added: Arc::new(RwLock::new(Vec::new())),
            torrents: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            remove_failure: Arc::new(RwLock::new(None)),
            report_duplicate_hash: Arc::new(RwLock::new(true)),
            resumed: Arc::new(RwLock::new(Vec::new())),
            paused: Arc::new(RwLock::new(Vec::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            default_save_path: "/mock/downloads".to_string(),
        }
    }

    /// Create a mock client with a custom save path.
    pub fn with_save_path(save_path: impl Into<String>) -> Self {
        Self {
            default_save_path: save_path.into(),
            ..Self::new()
        }
    }

    /// Get all recorded add_torrent calls.
    pub async fn added_torrents(&self) -> Vec<RecordedAddTorrent> {
        self.added.read().await.clone()
    }

    /// Hashes passed to successful resume calls, in order.
    pub async fn resumed(&self) -> Vec<String> {
        self.resumed.read().await.clone()
    }

    /// Hashes passed to successful pause calls, in order.
    pub async fn paused(&self) -> Vec<String> {
        self.paused.read().await.clone()
    }

    /// Hashes removed through the trait, in order.
    pub async fn removed(&self) -> Vec<String> {
        self.removed.read().await.clone()
    }

    /// Set the progress for a transfer (0.0 to 1.0).
    ///
    /// When progress reaches 1.0 a running transfer starts seeding.
    pub async fn set_progress(&self, hash: &str, progress: f64) {
        let mut torrents = self.torrents.write().await;
        if let Some(info) = torrents.get_mut(hash) {
            info.progress = progress.clamp(0.0, 1.0);
            if info.state != TorrentState::Paused {
                info.state = if info.progress >= 1.0 {
                    TorrentState::Seeding
                } else {
                    TorrentState::Downloading
                };
            }
        }
    }

    /// Set the share ratio for a transfer.
    pub async fn set_ratio(&self, hash: &str, ratio: f64) {
        let mut torrents = self.torrents.write().await;
        if let Some(info) = torrents.get_mut(hash) {
            info.ratio = ratio;
            info.uploaded_bytes = (info.size_bytes as f64 * ratio) as u64;
        }
    }

    /// Set the state for a transfer directly.
    pub async fn set_state(&self, hash: &str, state: TorrentState) {
        let mut torrents = self.torrents.write().await;
        if let Some(info) = torrents.get_mut(hash) {
            info.state = state;
        }
    }

    /// Set the save path reported for a transfer.
    pub async fn set_save_path(&self, hash: &str, save_path: Option<String>) {
        let mut torrents = self.torrents.write().await;
        if let Some(info) = torrents.get_mut(hash) {
            info.save_path = save_path;
        }
    }

    /// Drop a transfer as if a user removed it in the daemon's own UI.
    pub async fn remove_externally(&self, hash: &str) {
        self.torrents.write().await.remove(hash);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every remove call fail until cleared with `None`.
    pub async fn set_remove_failure(&self, message: Option<&str>) {
        *self.remove_failure.write().await = message.map(str::to_string);
    }

    /// Whether duplicate errors carry the existing hash (Transmission does,
    /// qBittorrent does not).
    pub async fn set_report_duplicate_hash(&self, report: bool) {
        *self.report_duplicate_hash.write().await = report;
    }

    /// Check if a transfer exists.
    pub async fn has_torrent(&self, hash: &str) -> bool {
        self.torrents.read().await.contains_key(hash)
    }

    /// Get the number of transfers.
    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    /// Pre-populate a transfer.
    pub async fn add_mock_torrent(&self, info: TorrentInfo) {
        self.torrents.write().await.insert(info.hash.clone(), info);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let payload = decode_torrent(&request.data)
            .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;
        let hash = payload.info_hash.clone();

        self.added.write().await.push(RecordedAddTorrent {
            request: request.clone(),
            hash: hash.clone(),
            timestamp: Utc::now(),
        });

        let mut torrents = self.torrents.write().await;
        if torrents.contains_key(&hash) {
            let existing_hash = if *self.report_duplicate_hash.read().await {
                Some(hash)
            } else {
                None
            };
            return Err(TorrentClientError::Duplicate { existing_hash });
        }

        let files: Vec<TorrentFile> = payload
            .files
            .iter()
            .map(|f| TorrentFile {
                path: f.path.clone(),
                size_bytes: f.size_bytes,
            })
            .collect();

        let info = TorrentInfo {
            hash: hash.clone(),
            name: payload.name.clone(),
            state: if request.paused {
                TorrentState::Paused
            } else {
                TorrentState::Downloading
            },
            progress: 0.0,
            size_bytes: files.iter().map(|f| f.size_bytes).sum(),
            uploaded_bytes: 0,
            ratio: 0.0,
            save_path: Some(
                request
                    .download_path
                    .clone()
                    .unwrap_or_else(|| self.default_save_path.clone()),
            ),
            files,
        };
        torrents.insert(hash.clone(), info);

        Ok(AddTorrentResult {
            hash,
            name: Some(payload.name),
        })
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.torrents
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn remove_torrent(
        &self,
        hash: &str,
        _delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if let Some(message) = self.remove_failure.read().await.clone() {
            return Err(TorrentClientError::ApiError(message));
        }

        if self.torrents.write().await.remove(hash).is_some() {
            self.removed.write().await.push(hash.to_string());
            Ok(())
        } else {
            Err(TorrentClientError::TorrentNotFound(hash.to_string()))
        }
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut torrents = self.torrents.write().await;
        let info = torrents
            .get_mut(hash)
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))?;
        info.state = TorrentState::Paused;
        self.paused.write().await.push(hash.to_string());
        Ok(())
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut torrents = self.torrents.write().await;
        let info = torrents
            .get_mut(hash)
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))?;
        info.state = if info.progress >= 1.0 {
            TorrentState::Seeding
        } else {
            TorrentState::Downloading
        };
        self.resumed.write().await.push(hash.to_string());
        Ok(())
    }
}
