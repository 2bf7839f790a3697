//! Transmission RPC client implementation.
//!
//! Transmission guards its RPC endpoint with a CSRF token: the first request
//! is answered with HTTP 409 and an `X-Transmission-Session-Id` header that
//! must be echoed on every subsequent request.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::TransmissionConfig;

use super::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentFile,
    TorrentInfo, TorrentState,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const TORRENT_FIELDS: &[&str] = &[
    "hashString",
    "name",
    "status",
    "percentDone",
    "totalSize",
    "uploadedEver",
    "uploadRatio",
    "downloadDir",
    "files",
    "error",
];

/// Transmission client implementation.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    session_id: RwLock<Option<String>>,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

impl TransmissionClient {
    /// Create a new Transmission client.
    pub fn new(config: TransmissionConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TorrentClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session_id: RwLock::new(None),
        })
    }

    async fn post_once(
        &self,
        body: &RpcRequest<'_>,
    ) -> Result<reqwest::Response, TorrentClientError> {
        let mut request = self.client.post(&self.config.url).json(body);
        if let Some(id) = self.session_id.read().await.as_ref() {
            request = request.header(SESSION_HEADER, id);
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }
        request.send().await.map_err(TorrentClientError::from_reqwest)
    }

    /// Call an RPC method, performing the session-id handshake when needed.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value, TorrentClientError> {
        let body = RpcRequest { method, arguments };

        let mut response = self.post_once(&body).await?;
        if response.status() == StatusCode::CONFLICT {
            let id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    TorrentClientError::ApiError("409 without session id header".to_string())
                })?;
            debug!("Transmission session id refreshed");
            *self.session_id.write().await = Some(id);
            response = self.post_once(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TorrentClientError::AuthenticationFailed(format!(
                "HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        interpret_result(parsed)
    }

    async fn call_ids(&self, method: &str, hash: &str) -> Result<(), TorrentClientError> {
        self.call(method, json!({ "ids": [hash.to_lowercase()] }))
            .await?;
        Ok(())
    }
}

/// Map an RPC envelope to its arguments or a typed error.
fn interpret_result(response: RpcResponse) -> Result<Value, TorrentClientError> {
    if response.result == "success" {
        return Ok(response.arguments);
    }
    if response.result.contains("duplicate torrent") {
        return Err(TorrentClientError::Duplicate {
            existing_hash: None,
        });
    }
    if response.result.contains("invalid or corrupt torrent") {
        return Err(TorrentClientError::InvalidTorrent(response.result));
    }
    Err(TorrentClientError::ApiError(response.result))
}

/// `torrent-add` success arguments.
fn parse_add_result(arguments: &Value) -> Result<AddTorrentResult, TorrentClientError> {
    if let Some(dup) = arguments.get("torrent-duplicate") {
        return Err(TorrentClientError::Duplicate {
            existing_hash: dup
                .get("hashString")
                .and_then(Value::as_str)
                .map(str::to_lowercase),
        });
    }

    let added = arguments
        .get("torrent-added")
        .ok_or_else(|| TorrentClientError::ApiError("missing torrent-added".to_string()))?;
    let hash = added
        .get("hashString")
        .and_then(Value::as_str)
        .ok_or_else(|| TorrentClientError::ApiError("missing hashString".to_string()))?;

    Ok(AddTorrentResult {
        hash: hash.to_lowercase(),
        name: added.get("name").and_then(Value::as_str).map(str::to_string),
    })
}

/// Transmission torrent-get entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTorrent {
    hash_string: String,
    #[serde(default)]
    name: String,
    status: i64,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    total_size: i64,
    #[serde(default)]
    uploaded_ever: i64,
    #[serde(default)]
    upload_ratio: f64,
    #[serde(default)]
    download_dir: String,
    #[serde(default)]
    files: Vec<TrFile>,
    #[serde(default)]
    error: i64,
}

#[derive(Debug, Deserialize)]
struct TrFile {
    name: String,
    length: i64,
}

impl From<TrTorrent> for TorrentInfo {
    fn from(t: TrTorrent) -> Self {
        // A stopped transfer stays Paused even with an error so it can be resumed.
        let state = if t.error != 0 && t.status != TR_STATUS_STOPPED {
            TorrentState::Error
        } else {
            parse_tr_status(t.status)
        };
        TorrentInfo {
            hash: t.hash_string.to_lowercase(),
            name: t.name,
            state,
            progress: t.percent_done,
            size_bytes: t.total_size.max(0) as u64,
            uploaded_bytes: t.uploaded_ever.max(0) as u64,
            ratio: parse_tr_ratio(t.upload_ratio),
            save_path: if t.download_dir.is_empty() {
                None
            } else {
                Some(t.download_dir)
            },
            files: t
                .files
                .into_iter()
                .map(|f| TorrentFile {
                    path: f.name,
                    size_bytes: f.length.max(0) as u64,
                })
                .collect(),
        }
    }
}

const TR_STATUS_STOPPED: i64 = 0;
const TR_RATIO_INF: f64 = -2.0;

/// Map Transmission's ratio sentinels: -1 is "not available", -2 is
/// "infinite" (uploaded without downloading anything).
fn parse_tr_ratio(ratio: f64) -> f64 {
    if ratio == TR_RATIO_INF {
        f64::INFINITY
    } else if ratio < 0.0 {
        0.0
    } else {
        ratio
    }
}

/// Parse the numeric Transmission status.
fn parse_tr_status(status: i64) -> TorrentState {
    match status {
        TR_STATUS_STOPPED => TorrentState::Paused,
        1 | 2 => TorrentState::Checking,
        3 | 5 => TorrentState::Queued,
        4 => TorrentState::Downloading,
        6 => TorrentState::Seeding,
        _ => TorrentState::Unknown,
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        let mut arguments = json!({
            "metainfo": STANDARD.encode(&request.data),
            "paused": request.paused,
        });
        if let Some(dir) = request
            .download_path
            .as_ref()
            .or(self.config.download_path.as_ref())
        {
            arguments["download-dir"] = json!(dir);
        }

        let result = self.call("torrent-add", arguments).await?;
        parse_add_result(&result)
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError> {
        let result = self
            .call(
                "torrent-get",
                json!({ "ids": [hash.to_lowercase()], "fields": TORRENT_FIELDS }),
            )
            .await?;

        let torrents: Vec<TrTorrent> = serde_json::from_value(
            result.get("torrents").cloned().unwrap_or(Value::Array(vec![])),
        )
        .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse torrents: {}", e)))?;

        torrents
            .into_iter()
            .next()
            .map(TorrentInfo::from)
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn remove_torrent(&self, hash: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        self.call(
            "torrent-remove",
            json!({ "ids": [hash.to_lowercase()], "delete-local-data": delete_files }),
        )
        .await?;
        Ok(())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.call_ids("torrent-stop", hash).await
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.call_ids("torrent-start", hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TransmissionConfig {
        TransmissionConfig {
            url: "http://localhost:9091/transmission/rpc".to_string(),
            username: None,
            password: None,
            timeout_secs: 5,
            download_path: None,
        }
    }

    #[test]
    fn test_client_name() {
        let client = TransmissionClient::new(config()).unwrap();
        assert_eq!(client.name(), "transmission");
    }

    #[test]
    fn test_parse_tr_status() {
        assert_eq!(parse_tr_status(0), TorrentState::Paused);
        assert_eq!(parse_tr_status(1), TorrentState::Checking);
        assert_eq!(parse_tr_status(2), TorrentState::Checking);
        assert_eq!(parse_tr_status(3), TorrentState::Queued);
        assert_eq!(parse_tr_status(4), TorrentState::Downloading);
        assert_eq!(parse_tr_status(5), TorrentState::Queued);
        assert_eq!(parse_tr_status(6), TorrentState::Seeding);
        assert_eq!(parse_tr_status(42), TorrentState::Unknown);
    }

    #[test]
    fn test_interpret_result() {
        let ok = RpcResponse {
            result: "success".to_string(),
            arguments: json!({"torrents": []}),
        };
        assert!(interpret_result(ok).is_ok());

        let dup = RpcResponse {
            result: "duplicate torrent".to_string(),
            arguments: Value::Null,
        };
        assert!(matches!(
            interpret_result(dup),
            Err(TorrentClientError::Duplicate { existing_hash: None })
        ));

        let other = RpcResponse {
            result: "no such method".to_string(),
            arguments: Value::Null,
        };
        assert!(matches!(
            interpret_result(other),
            Err(TorrentClientError::ApiError(_))
        ));
    }

    #[test]
    fn test_parse_add_result() {
        let added = json!({"torrent-added": {"hashString": "ABCDEF", "id": 3, "name": "Show.S01E01"}});
        let result = parse_add_result(&added).unwrap();
        assert_eq!(result.hash, "abcdef");
        assert_eq!(result.name.as_deref(), Some("Show.S01E01"));

        let dup = json!({"torrent-duplicate": {"hashString": "FEDCBA", "id": 1}});
        match parse_add_result(&dup) {
            Err(TorrentClientError::Duplicate { existing_hash }) => {
                assert_eq!(existing_hash.as_deref(), Some("fedcba"));
            }
            other => panic!("expected duplicate, got {:?}", other),
        }

        assert!(parse_add_result(&json!({})).is_err());
    }

    #[test]
    fn test_torrent_conversion() {
        let json = json!({
            "hashString": "AbC123",
            "name": "Dexter.S05E01.HDTV",
            "status": 6,
            "percentDone": 1.0,
            "totalSize": 734003200,
            "uploadedEver": 1468006400,
            "uploadRatio": 2.0,
            "downloadDir": "/downloads",
            "error": 0,
            "files": [
                {"name": "Dexter.S05E01.HDTV/dexter.s05e01.avi", "length": 734000000, "bytesCompleted": 734000000},
                {"name": "Dexter.S05E01.HDTV/info.nfo", "length": 3200, "bytesCompleted": 3200}
            ]
        });
        let parsed: TrTorrent = serde_json::from_value(json).unwrap();
        let info = TorrentInfo::from(parsed);

        assert_eq!(info.hash, "abc123");
        assert_eq!(info.state, TorrentState::Seeding);
        assert!(info.is_complete());
        assert_eq!(info.ratio, 2.0);
        assert_eq!(info.save_path.as_deref(), Some("/downloads"));
        assert_eq!(
            info.largest_file().unwrap().path,
            "Dexter.S05E01.HDTV/dexter.s05e01.avi"
        );
    }

    #[test]
    fn test_conversion_clamps_unavailable_ratio_and_flags_error() {
        let json = json!({
            "hashString": "abc",
            "status": 4,
            "uploadRatio": -1.0,
            "error": 3
        });
        let info = TorrentInfo::from(serde_json::from_value::<TrTorrent>(json).unwrap());
        assert_eq!(info.ratio, 0.0);
        assert_eq!(info.state, TorrentState::Error);
        assert!(info.files.is_empty());
        assert!(info.save_path.is_none());
    }

    #[test]
    fn test_seed_only_transfer_has_infinite_ratio() {
        let json = json!({
            "hashString": "abc",
            "status": 6,
            "percentDone": 1.0,
            "uploadedEver": 5000000,
            "uploadRatio": -2.0
        });
        let info = TorrentInfo::from(serde_json::from_value::<TrTorrent>(json).unwrap());
        assert!(info.ratio.is_infinite());
        assert!(info.ratio >= 1000.0);
    }

    #[test]
    fn test_parse_tr_ratio() {
        assert_eq!(parse_tr_ratio(1.5), 1.5);
        assert_eq!(parse_tr_ratio(0.0), 0.0);
        assert_eq!(parse_tr_ratio(-1.0), 0.0);
        assert_eq!(parse_tr_ratio(-2.0), f64::INFINITY);
    }

    #[test]
    fn test_stopped_transfer_with_error_stays_resumable() {
        let json = json!({
            "hashString": "abc",
            "status": 0,
            "percentDone": 0.4,
            "error": 3
        });
        let info = TorrentInfo::from(serde_json::from_value::<TrTorrent>(json).unwrap());
        assert_eq!(info.state, TorrentState::Paused);
        assert!(info.state.is_stopped());
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_unavailable() {
        let client = TransmissionClient::new(TransmissionConfig {
            url: "http://127.0.0.1:1/transmission/rpc".to_string(),
            timeout_secs: 2,
            ..config()
        })
        .unwrap();

        let err = client.get_torrent("abc").await.unwrap_err();
        assert!(err.is_unavailable(), "got {:?}", err);
    }
}
