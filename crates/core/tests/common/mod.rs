//! Shared harness for core integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use episodic_core::{
    config::{ShowDefaults, ShowEntry},
    testing::{fixtures, MockFeedSource, MockMetadataLookup, MockPayloadFetcher, MockTorrentClient},
    AcquisitionContext, FeedEntry, RetryPolicy, ShowConfig, ShowRegistry, SqliteEpisodeStore,
    TorrentClient,
};

/// Mocks, a real SQLite store and a scratch download/library tree.
pub struct Harness {
    pub store: Arc<SqliteEpisodeStore>,
    pub feed: Arc<MockFeedSource>,
    pub metadata: Arc<MockMetadataLookup>,
    pub payloads: Arc<MockPayloadFetcher>,
    pub client: Arc<MockTorrentClient>,
    pub downloads: PathBuf,
    pub library: PathBuf,
    _temp_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads = temp_dir.path().join("downloads");
        let library = temp_dir.path().join("library");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::create_dir_all(&library).unwrap();

        let store = Arc::new(
            SqliteEpisodeStore::new(&temp_dir.path().join("episodic.db"))
                .expect("Failed to create episode store"),
        );

        Self {
            store,
            feed: Arc::new(MockFeedSource::new()),
            metadata: Arc::new(MockMetadataLookup::new()),
            payloads: Arc::new(MockPayloadFetcher::new()),
            client: Arc::new(MockTorrentClient::with_save_path(
                downloads.to_string_lossy().to_string(),
            )),
            downloads,
            library,
            _temp_dir: temp_dir,
        }
    }

    /// A show entry with the harness library as destination.
    pub fn entry(&self, name: &str) -> ShowEntry {
        ShowEntry {
            name: Some(name.to_string()),
            destination: Some(format!(
                "{}/{{show_name}}/Season {{season:02}}/{{show_name}} - s{{season:02}}e{{episode:02}} - {{title}}",
                self.library.display()
            )),
            ..Default::default()
        }
    }

    pub fn show(&self, key: &str, entry: ShowEntry) -> ShowConfig {
        ShowConfig::resolve(key, &entry, &ShowDefaults::default()).expect("valid show")
    }

    pub fn context(&self, shows: Vec<ShowConfig>) -> AcquisitionContext {
        self.context_with_registry(ShowRegistry::from_shows(shows))
    }

    pub fn context_with_registry(&self, registry: ShowRegistry) -> AcquisitionContext {
        AcquisitionContext::new(
            self.store.clone(),
            Arc::new(registry),
            self.feed.clone(),
            self.metadata.clone(),
            self.payloads.clone(),
            self.client.clone(),
        )
        .with_download_dir(&self.downloads)
        .with_cleanup_retry(RetryPolicy {
            base: Duration::ZERO,
            max: Duration::ZERO,
        })
    }

    /// Publish a single-file episode release: feed entry, payload and the
    /// file the daemon would download. Returns the transfer handle.
    pub async fn publish(&self, show: &str, season: u32, episode: u32, title: &str) -> String {
        let file_name = release_name(show, season, episode, "mkv");
        let bytes = fixtures::single_file_torrent(&file_name, 4096);
        self.publish_payload(show, season, episode, &fixtures::summary(show, season, episode, title), bytes)
            .await
    }

    /// Publish an arbitrary payload under an arbitrary summary.
    pub async fn publish_payload(
        &self,
        show: &str,
        season: u32,
        episode: u32,
        summary: &str,
        bytes: Vec<u8>,
    ) -> String {
        let url = format!(
            "http://feed.test/{}/{}/{}.torrent",
            show.replace(' ', "_"),
            season,
            episode
        );
        let hash = fixtures::info_hash_of(&bytes);
        self.payloads.insert(&url, bytes).await;
        self.feed
            .push_entry(show, season, FeedEntry::new(url, summary))
            .await;
        hash
    }

    /// Write a downloaded file under the download directory.
    pub fn write_download(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.downloads.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Mark a transfer as downloaded and write its file to disk.
    pub async fn finish_download(&self, hash: &str, ratio: f64) {
        let info = self.client.get_torrent(hash).await.expect("transfer exists");
        for file in &info.files {
            self.write_download(&file.path, b"episode bytes");
        }
        self.client.set_progress(hash, 1.0).await;
        self.client.set_ratio(hash, ratio).await;
    }

    pub fn library_file(&self, show: &str, season: u32, episode: u32, title: &str) -> PathBuf {
        self.library
            .join(show)
            .join(format!("Season {:02}", season))
            .join(format!("{} - s{:02}e{:02} - {}.mkv", show, season, episode, title))
    }
}

pub fn release_name(show: &str, season: u32, episode: u32, ext: &str) -> String {
    format!("{}.S{:02}E{:02}.{}", show.replace(' ', "."), season, episode, ext)
}

