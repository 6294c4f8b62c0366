//! Indexer clients for Fetcharr
//!
//! Implementations of the core `Indexer` contract. The engine talks to
//! an aggregation service (Prowlarr) rather than individual trackers;
//! the aggregator owns release-name parsing and scoring.

pub mod models;
pub mod prowlarr;

pub use models::{ProwlarrSearchResult, WireProtocol, WireQuality, WireTvInfo};
pub use prowlarr::{ProwlarrClient, ProwlarrConfig};
