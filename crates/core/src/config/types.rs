use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub metadata: Option<MetadataConfig>,
    #[serde(default)]
    pub torrent_client: Option<TorrentClientConfig>,
    #[serde(default)]
    pub payload: PayloadConfig,
    /// Values applied to every show that does not override them.
    #[serde(default)]
    pub defaults: ShowDefaults,
    /// Tracked shows, keyed by their stable show key.
    #[serde(default)]
    pub shows: BTreeMap<String, ShowEntry>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    9191
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("episodic.db")
}

fn default_timeout() -> u32 {
    30
}

/// Episode feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Feed URL with `{show_name}`, `{quality}` and `{season}` placeholders.
    #[serde(default = "default_feed_url")]
    pub url_template: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url_template: default_feed_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    "http://ezrss.it/search/?mode=rss&show_name={show_name}&quality={quality}&season={season}"
        .to_string()
}

/// Payload (.torrent) download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayloadConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// Series metadata configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    /// TMDB-specific configuration (required when backend = "tmdb")
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
}

/// Available metadata backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataBackend {
    Tmdb,
}

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Torrent client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TorrentClientConfig {
    pub backend: TorrentClientBackend,
    #[serde(default)]
    pub transmission: Option<TransmissionConfig>,
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
}

impl TorrentClientConfig {
    /// Download directory configured for the selected backend.
    pub fn download_path(&self) -> Option<&str> {
        match self.backend {
            TorrentClientBackend::Transmission => self
                .transmission
                .as_ref()
                .and_then(|t| t.download_path.as_deref()),
            TorrentClientBackend::QBittorrent => self
                .qbittorrent
                .as_ref()
                .and_then(|q| q.download_path.as_deref()),
        }
    }
}

/// Available torrent client backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TorrentClientBackend {
    Transmission,
    QBittorrent,
}

impl TorrentClientBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentClientBackend::Transmission => "transmission",
            TorrentClientBackend::QBittorrent => "qbittorrent",
        }
    }
}

/// Transmission RPC configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransmissionConfig {
    /// RPC endpoint (e.g., "http://localhost:9091/transmission/rpc")
    #[serde(default = "default_transmission_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Download directory override passed on every add
    #[serde(default)]
    pub download_path: Option<String>,
}

fn default_transmission_url() -> String {
    "http://localhost:9091/transmission/rpc".to_string()
}

/// qBittorrent Web API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub download_path: Option<String>,
}

/// Show settings shared by every show unless overridden.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShowDefaults {
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_seed_ratio")]
    pub seed_ratio: f64,
    #[serde(default = "default_one")]
    pub start_season: u32,
    #[serde(default = "default_one")]
    pub start_episode: u32,
    #[serde(default)]
    pub exclude_extensions: Vec<String>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Destination template used by shows that do not set their own.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub keep_paused: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ShowDefaults {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            seed_ratio: default_seed_ratio(),
            start_season: default_one(),
            start_episode: default_one(),
            exclude_extensions: Vec::new(),
            max_concurrent: default_max_concurrent(),
            destination: None,
            keep_paused: false,
            language: default_language(),
        }
    }
}

fn default_quality() -> String {
    "HDTV".to_string()
}

fn default_seed_ratio() -> f64 {
    1.0
}

fn default_one() -> u32 {
    1
}

fn default_max_concurrent() -> usize {
    2
}

fn default_language() -> String {
    "en".to_string()
}

/// A `[shows.<key>]` table as written; unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShowEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub seed_ratio: Option<f64>,
    #[serde(default)]
    pub start_season: Option<u32>,
    #[serde(default)]
    pub start_episode: Option<u32>,
    #[serde(default)]
    pub exclude_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub keep_paused: Option<bool>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub orchestrator: OrchestratorConfig,
    pub feed: FeedConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SanitizedMetadataConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent_client: Option<SanitizedTorrentClientConfig>,
    pub payload: PayloadConfig,
    pub defaults: ShowDefaults,
    pub shows: Vec<String>,
}

/// Sanitized metadata config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMetadataConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub api_key_configured: bool,
}

/// Sanitized torrent client config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTorrentClientConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub credentials_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            orchestrator: config.orchestrator.clone(),
            feed: config.feed.clone(),
            metadata: config.metadata.as_ref().map(|m| SanitizedMetadataConfig {
                backend: match m.backend {
                    MetadataBackend::Tmdb => "tmdb".to_string(),
                },
                base_url: m.tmdb.as_ref().and_then(|t| t.base_url.clone()),
                api_key_configured: m.tmdb.as_ref().is_some_and(|t| !t.api_key.is_empty()),
            }),
            torrent_client: config.torrent_client.as_ref().map(sanitize_torrent_client),
            payload: config.payload.clone(),
            defaults: config.defaults.clone(),
            shows: config.shows.keys().cloned().collect(),
        }
    }
}

fn sanitize_torrent_client(tc: &TorrentClientConfig) -> SanitizedTorrentClientConfig {
    let (url, credentials_configured) = match tc.backend {
        TorrentClientBackend::Transmission => match &tc.transmission {
            Some(t) => (Some(t.url.clone()), t.username.is_some()),
            None => (None, false),
        },
        TorrentClientBackend::QBittorrent => match &tc.qbittorrent {
            Some(q) => (Some(q.url.clone()), !q.username.is_empty()),
            None => (None, false),
        },
    };
    SanitizedTorrentClientConfig {
        backend: tc.backend.as_str().to_string(),
        url,
        credentials_configured,
        download_path: tc.download_path().map(str::to_string),
    }
}
