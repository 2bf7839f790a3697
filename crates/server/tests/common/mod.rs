//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by a real SQLite store and mock collaborators, so the API can be
//! exercised without a feed, a metadata service or a transfer daemon.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use episodic_core::{
    load_config_from_str,
    testing::{MockFeedSource, MockMetadataLookup, MockPayloadFetcher, MockTorrentClient},
    AcquisitionContext, AcquisitionOrchestrator, Config, FeedEntry, ShowRegistry,
    SqliteEpisodeStore,
};
use episodic_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use episodic_core::testing::fixtures;

/// Test fixture with a router, its store and controllable mocks.
///
/// Two shows are configured: `dexter` (valid) and `broken` (no destination,
/// so it is reported as invalid).
pub struct TestFixture {
    pub router: Router,
    pub store: Arc<SqliteEpisodeStore>,
    pub orchestrator: Arc<AcquisitionOrchestrator>,
    pub feed: Arc<MockFeedSource>,
    pub metadata: Arc<MockMetadataLookup>,
    pub payloads: Arc<MockPayloadFetcher>,
    pub torrent_client: Arc<MockTorrentClient>,
    pub downloads: PathBuf,
    pub library: PathBuf,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let downloads = temp_dir.path().join("downloads");
        let library = temp_dir.path().join("library");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::create_dir_all(&library).unwrap();

        let config = test_config(&db_path, &library);

        let store = Arc::new(
            SqliteEpisodeStore::new(&db_path).expect("Failed to create episode store"),
        );
        let feed = Arc::new(MockFeedSource::new());
        let metadata = Arc::new(MockMetadataLookup::new());
        let payloads = Arc::new(MockPayloadFetcher::new());
        let torrent_client = Arc::new(MockTorrentClient::with_save_path(
            downloads.to_string_lossy().to_string(),
        ));

        let ctx = AcquisitionContext::new(
            store.clone(),
            Arc::new(ShowRegistry::from_config(&config)),
            feed.clone(),
            metadata.clone(),
            payloads.clone(),
            torrent_client.clone(),
        )
        .with_download_dir(&downloads);

        // Passes run only on demand in API tests.
        let orchestrator = Arc::new(AcquisitionOrchestrator::new(
            config.orchestrator.clone(),
            Arc::new(ctx),
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        let router = create_router(state);

        Self {
            router,
            store,
            orchestrator,
            feed,
            metadata,
            payloads,
            torrent_client,
            downloads,
            library,
            temp_dir,
        }
    }

    /// Publish a single-file release of a Dexter episode on the feed.
    /// Returns the transfer handle the daemon will report.
    pub async fn publish(&self, season: u32, episode: u32, title: &str) -> String {
        let name = format!("Dexter.S{:02}E{:02}.mkv", season, episode);
        let bytes = fixtures::single_file_torrent(&name, 4096);
        let hash = fixtures::info_hash_of(&bytes);
        let url = format!("http://feed.test/dexter/{}/{}.torrent", season, episode);
        self.payloads.insert(&url, bytes).await;
        self.feed
            .push_entry(
                "Dexter",
                season,
                FeedEntry::new(url, fixtures::summary("Dexter", season, episode, title)),
            )
            .await;
        hash
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

fn test_config(db_path: &std::path::Path, library: &std::path::Path) -> Config {
    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 9191

[database]
path = '{db}'

[orchestrator]
enabled = false

[metadata]
backend = "tmdb"
[metadata.tmdb]
api_key = "secret-tmdb-key"

[torrent_client]
backend = "transmission"
[torrent_client.transmission]
url = "http://localhost:9091/transmission/rpc"
username = "admin"
password = "secret-password"

[shows.dexter]
name = "Dexter"
destination = '{library}/{{show_name}}/Season {{season:02}}/{{show_name}} - s{{season:02}}e{{episode:02}} - {{title}}'

[shows.broken]
name = "Broken Show"
"#,
        db = db_path.display(),
        library = library.display(),
    );
    load_config_from_str(&toml).expect("valid test config")
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
