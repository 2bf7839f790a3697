//! qBittorrent torrent client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;
use crate::payload::decode_torrent;

use super::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentFile,
    TorrentInfo, TorrentState,
};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Whether the cookie jar holds a live session.
    session: Arc<RwLock<bool>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(false)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await
            .map_err(TorrentClientError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            *self.session.write().await = true;
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if *self.session.read().await {
            return Ok(());
        }
        self.login().await
    }

    /// Send an authenticated request, logging in again once on HTTP 403.
    ///
    /// `build` is called for every attempt since request builders are
    /// consumed by `send`.
    async fn send<F>(&self, build: F) -> Result<(StatusCode, String), TorrentClientError>
    where
        F: Fn() -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let mut response = build()
            .send()
            .await
            .map_err(TorrentClientError::from_reqwest)?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!("qBittorrent session expired, re-authenticating");
            *self.session.write().await = false;
            self.login().await?;
            response = build()
                .send()
                .await
                .map_err(TorrentClientError::from_reqwest)?;
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        Ok((status, body))
    }

    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        let (status, body) = self.send(|| self.client.get(&url)).await?;
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }
        Ok(body)
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        let (status, body) = self.send(|| self.client.post(&url).form(params)).await?;
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }
        Ok(body)
    }

    fn add_form(&self, request: &AddTorrentRequest) -> multipart::Form {
        let file_part = multipart::Part::bytes(request.data.clone()).file_name(
            request
                .filename
                .clone()
                .unwrap_or_else(|| "episode.torrent".to_string()),
        );

        let mut form = multipart::Form::new().part("torrents", file_part);
        if let Some(path) = request
            .download_path
            .as_ref()
            .or(self.config.download_path.as_ref())
        {
            form = form.text("savepath", path.clone());
        }
        if request.paused {
            form = form.text("paused", "true").text("stopped", "true");
        }
        form
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    size: i64,
    uploaded: i64,
    ratio: f64,
    save_path: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self, files: Vec<TorrentFile>) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            progress: self.progress,
            size_bytes: self.size.max(0) as u64,
            uploaded_bytes: self.uploaded.max(0) as u64,
            ratio: self.ratio,
            save_path: if self.save_path.is_empty() {
                None
            } else {
                Some(self.save_path)
            },
            files,
        }
    }
}

/// qBittorrent file listing entry.
#[derive(Debug, Deserialize)]
struct QBTorrentFile {
    name: String,
    size: i64,
}

/// Parse qBittorrent state string to TorrentState.
fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "allocating" => TorrentState::Downloading,
        "uploading" | "forcedUP" => TorrentState::Seeding,
        "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => TorrentState::Paused,
        "checkingDL" | "checkingUP" | "checkingResumeData" | "moving" => TorrentState::Checking,
        "queuedDL" | "queuedUP" => TorrentState::Queued,
        "stalledDL" | "stalledUP" => TorrentState::Stalled,
        "error" | "missingFiles" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        // The add endpoint does not report the hash, so take it from the metainfo.
        let payload = decode_torrent(&request.data)
            .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;

        let url = self.url("/api/v2/torrents/add");
        let (status, body) = self
            .send(|| self.client.post(&url).multipart(self.add_form(&request)))
            .await?;

        if status == StatusCode::CONFLICT || body.trim() == "Fails." {
            return Err(TorrentClientError::Duplicate {
                existing_hash: Some(payload.info_hash),
            });
        }
        if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            return Err(TorrentClientError::InvalidTorrent(body));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        Ok(AddTorrentResult {
            hash: payload.info_hash,
            name: Some(payload.name),
        })
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let response = self
            .get(&format!("/api/v2/torrents/info?hashes={}", hash_lower))
            .await?;

        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        let Some(torrent) = torrents.into_iter().next() else {
            return Err(TorrentClientError::TorrentNotFound(hash.to_string()));
        };

        let response = self
            .get(&format!("/api/v2/torrents/files?hash={}", hash_lower))
            .await?;
        let files: Vec<QBTorrentFile> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse files: {}", e)))?;

        let files = files
            .into_iter()
            .map(|f| TorrentFile {
                path: f.name,
                size_bytes: f.size.max(0) as u64,
            })
            .collect();

        Ok(torrent.into_torrent_info(files))
    }

    async fn remove_torrent(&self, hash: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let delete_str = if delete_files { "true" } else { "false" };

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &hash_lower), ("deleteFiles", delete_str)],
        )
        .await?;

        Ok(())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        // qBittorrent 5 renamed pause/resume to stop/start.
        if let Err(e) = self
            .post_form("/api/v2/torrents/stop", &[("hashes", &hash_lower)])
            .await
        {
            debug!(error = %e, "stop endpoint failed, falling back to pause");
            self.post_form("/api/v2/torrents/pause", &[("hashes", &hash_lower)])
                .await?;
        }
        Ok(())
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        if let Err(e) = self
            .post_form("/api/v2/torrents/start", &[("hashes", &hash_lower)])
            .await
        {
            debug!(error = %e, "start endpoint failed, falling back to resume");
            self.post_form("/api/v2/torrents/resume", &[("hashes", &hash_lower)])
                .await?;
        }
        Ok(())
    }
}
