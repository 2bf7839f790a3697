//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external collaborator,
//! so planner, monitor and orchestrator can be exercised without a feed, a
//! metadata service or a transfer daemon.
//!
//! # Example
//!
//! ```rust,ignore
//! use episodic_core::testing::{fixtures, MockFeedSource, MockPayloadFetcher};
//!
//! let feed = MockFeedSource::new();
//! let payloads = MockPayloadFetcher::new();
//!
//! let bytes = fixtures::single_file_torrent("Dexter.S05E01.mkv", 1_000);
//! payloads.insert("http://feed/1.torrent", bytes).await;
//! feed.push_entry("Dexter", 5, FeedEntry::new(
//!     "http://feed/1.torrent",
//!     fixtures::summary("Dexter", 5, 1, "My Bad"),
//! )).await;
//! ```

mod mock_feed;
mod mock_metadata;
mod mock_payload;
mod mock_torrent_client;

pub use mock_feed::MockFeedSource;
pub use mock_metadata::MockMetadataLookup;
pub use mock_payload::MockPayloadFetcher;
pub use mock_torrent_client::{MockTorrentClient, RecordedAddTorrent};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::payload::decode_torrent;

    const PIECE_LENGTH: u64 = 16 * 1024;

    /// Feed summary in the `Key: Value; ...` form feeds use.
    pub fn summary(show: &str, season: u32, episode: u32, title: &str) -> String {
        format!(
            "Show Name: {}; Episode Title: {}; Season: {}; Episode: {}",
            show, title, season, episode
        )
    }

    /// Bencoded single-file .torrent.
    pub fn single_file_torrent(name: &str, length: u64) -> Vec<u8> {
        let mut info = Vec::new();
        info.push(b'd');
        bstr(&mut info, b"length");
        int(&mut info, length);
        name_and_pieces(&mut info, name, length);
        info.push(b'e');
        wrap(info)
    }

    /// Bencoded multi-file .torrent. File paths are `/`-separated and
    /// relative to the torrent directory `name`.
    pub fn multi_file_torrent(name: &str, files: &[(&str, u64)]) -> Vec<u8> {
        let mut info = Vec::new();
        info.push(b'd');
        bstr(&mut info, b"files");
        info.push(b'l');
        for (path, length) in files {
            info.push(b'd');
            bstr(&mut info, b"length");
            int(&mut info, *length);
            bstr(&mut info, b"path");
            info.push(b'l');
            for part in path.split('/') {
                bstr(&mut info, part.as_bytes());
            }
            info.push(b'e');
            info.push(b'e');
        }
        info.push(b'e');
        let total = files.iter().map(|(_, l)| l).sum();
        name_and_pieces(&mut info, name, total);
        info.push(b'e');
        wrap(info)
    }

    /// Info-hash of a fixture torrent, as the daemon would report it.
    pub fn info_hash_of(bytes: &[u8]) -> String {
        decode_torrent(bytes)
            .map(|p| p.info_hash)
            .unwrap_or_default()
    }

    fn name_and_pieces(out: &mut Vec<u8>, name: &str, total: u64) {
        bstr(out, b"name");
        bstr(out, name.as_bytes());
        bstr(out, b"piece length");
        int(out, PIECE_LENGTH);
        bstr(out, b"pieces");
        let count = total.div_ceil(PIECE_LENGTH).max(1) as usize;
        let pieces = vec![0u8; count * 20];
        bstr(out, &pieces);
    }

    fn wrap(info: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::with_capacity(info.len() + 64);
        out.push(b'd');
        bstr(&mut out, b"announce");
        bstr(&mut out, b"http://tracker.example/announce");
        bstr(&mut out, b"info");
        out.extend_from_slice(&info);
        out.push(b'e');
        out
    }

    fn bstr(out: &mut Vec<u8>, value: &[u8]) {
        out.extend_from_slice(value.len().to_string().as_bytes());
        out.push(b':');
        out.extend_from_slice(value);
    }

    fn int(out: &mut Vec<u8>, value: u64) {
        out.push(b'i');
        out.extend_from_slice(value.to_string().as_bytes());
        out.push(b'e');
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::identity::parse_summary;

        #[test]
        fn test_fixture_torrents_decode() {
            let single = decode_torrent(&single_file_torrent("Show.S01E01.mkv", 40_000)).unwrap();
            assert!(single.single_file);
            assert_eq!(single.primary_extension(), "mkv");

            let multi = decode_torrent(&multi_file_torrent(
                "Show.S01E01",
                &[("Show.S01E01.mkv", 40_000), ("sample/sample.mkv", 100)],
            ))
            .unwrap();
            assert!(!multi.single_file);
            assert_eq!(multi.files.len(), 2);
            assert_eq!(multi.files[1].path, "Show.S01E01/sample/sample.mkv");
        }

        #[test]
        fn test_distinct_names_have_distinct_hashes() {
            let a = info_hash_of(&single_file_torrent("Show.S01E01.mkv", 1000));
            let b = info_hash_of(&single_file_torrent("Show.S01E02.mkv", 1000));
            assert_eq!(a.len(), 40);
            assert_ne!(a, b);
        }

        #[test]
        fn test_summary_parses() {
            let info = parse_summary(&summary("Dexter", 5, 2, "Hello, Bandit")).unwrap();
            assert_eq!((info.season, info.episode), (5, 2));
            assert_eq!(info.title.as_deref(), Some("Hello, Bandit"));
        }
    }
}
