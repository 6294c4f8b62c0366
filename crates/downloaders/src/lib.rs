//! Download client integrations for Fetcharr
//!
//! Implementations of the core `GrabClient` contract.

pub mod qbittorrent;

pub use qbittorrent::{QBittorrentClient, QBittorrentConfig};
