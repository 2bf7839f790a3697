//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for driving the transfer
//! daemon, with Transmission (RPC) and qBittorrent (Web API v2) backends.

mod qbittorrent;
mod transmission;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use transmission::TransmissionClient;
pub use types::*;
