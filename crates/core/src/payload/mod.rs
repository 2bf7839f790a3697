//! Payload retrieval: downloading a feed item's .torrent file and decoding it.

mod fetcher;
mod torrent_parser;

pub use fetcher::{HttpPayloadFetcher, PayloadError, PayloadFetcher};
pub use torrent_parser::{decode_torrent, PayloadFile, TorrentPayload};
