//! Torrent metainfo decoding.
//!
//! Uses librqbit-core to parse bencoded .torrent data into the info-hash and
//! the file listing without contacting any peer.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use serde::Serialize;

use super::PayloadError;
use crate::placer::extension_of;

/// A file listed in a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadFile {
    /// Path inside the torrent, `/`-separated. Multi-file torrents are
    /// prefixed with the torrent name.
    pub path: String,
    pub size_bytes: u64,
}

/// A decoded .torrent file.
#[derive(Debug, Clone, Serialize)]
pub struct TorrentPayload {
    /// Info-hash, lowercase hex.
    pub info_hash: String,
    /// Torrent name (file name for single-file torrents).
    pub name: String,
    pub files: Vec<PayloadFile>,
    pub single_file: bool,
}

impl TorrentPayload {
    /// The file the episode lives in: the named file of a single-file
    /// torrent, else the largest member.
    pub fn primary_file(&self) -> Option<&PayloadFile> {
        if self.single_file {
            self.files.first()
        } else {
            self.files.iter().max_by_key(|f| f.size_bytes)
        }
    }

    /// Extension of the primary file, without the dot.
    pub fn primary_extension(&self) -> &str {
        self.primary_file()
            .map(|f| extension_of(&f.path))
            .unwrap_or("")
    }
}

/// Decode raw .torrent bytes.
pub fn decode_torrent(bytes: &[u8]) -> Result<TorrentPayload, PayloadError> {
    if bytes.is_empty() {
        return Err(PayloadError::Decode("empty payload".to_string()));
    }

    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| PayloadError::Decode(e.to_string()))?;

    let info = &torrent.info;
    let name = info
        .name
        .as_ref()
        .map(|b| bytes_to_string(b.as_ref()))
        .unwrap_or_else(|| "unknown".to_string());

    let (files, single_file) = if let Some(ref files) = info.files {
        let mut result = Vec::with_capacity(files.len());
        for file in files {
            let mut parts = vec![name.clone()];
            parts.extend(file.path.iter().map(|p| bytes_to_string(p.as_ref())));
            result.push(PayloadFile {
                path: parts.join("/"),
                size_bytes: file.length,
            });
        }
        (result, false)
    } else if let Some(length) = info.length {
        (
            vec![PayloadFile {
                path: name.clone(),
                size_bytes: length,
            }],
            true,
        )
    } else {
        (Vec::new(), false)
    };

    if files.is_empty() {
        return Err(PayloadError::Decode("torrent lists no files".to_string()));
    }

    Ok(TorrentPayload {
        info_hash: torrent.info_hash.as_string().to_lowercase(),
        name,
        files,
        single_file,
    })
}

/// Convert bytes to a string, replacing invalid UTF-8.
fn bytes_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
