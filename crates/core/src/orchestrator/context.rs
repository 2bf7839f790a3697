//! Everything a discovery or monitor pass needs, built once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::ShowRegistry;
use crate::feed::FeedSource;
use crate::metadata::MetadataLookup;
use crate::payload::PayloadFetcher;
use crate::placer::FsPlacer;
use crate::store::EpisodeStore;
use crate::torrent_client::TorrentClient;

use super::config::RetryPolicy;

/// Collaborators and settings shared by the planner and the monitor.
///
/// Passes receive the context explicitly; nothing reads global state.
pub struct AcquisitionContext {
    pub store: Arc<dyn EpisodeStore>,
    pub shows: Arc<ShowRegistry>,
    pub feed: Arc<dyn FeedSource>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub payloads: Arc<dyn PayloadFetcher>,
    pub torrent_client: Arc<dyn TorrentClient>,
    pub placer: FsPlacer,
    /// Used when the torrent client does not report a transfer's save path.
    pub download_dir: Option<PathBuf>,
    pub cleanup_retry: RetryPolicy,
    show_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AcquisitionContext {
    pub fn new(
        store: Arc<dyn EpisodeStore>,
        shows: Arc<ShowRegistry>,
        feed: Arc<dyn FeedSource>,
        metadata: Arc<dyn MetadataLookup>,
        payloads: Arc<dyn PayloadFetcher>,
        torrent_client: Arc<dyn TorrentClient>,
    ) -> Self {
        Self {
            store,
            shows,
            feed,
            metadata,
            payloads,
            torrent_client,
            placer: FsPlacer::new(),
            download_dir: None,
            cleanup_retry: RetryPolicy::default(),
            show_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn with_cleanup_retry(mut self, policy: RetryPolicy) -> Self {
        self.cleanup_retry = policy;
        self
    }

    pub fn with_placer(mut self, placer: FsPlacer) -> Self {
        self.placer = placer;
        self
    }

    /// Directory a transfer's files are relative to.
    pub fn download_dir_for<'a>(&'a self, save_path: Option<&'a str>) -> Option<&'a Path> {
        save_path
            .filter(|p| !p.is_empty())
            .map(Path::new)
            .or(self.download_dir.as_deref())
    }

    /// Acquire the per-show lock that serializes check-and-commit sequences.
    pub async fn lock_show(&self, show_key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .show_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(show_key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
