//! Search criteria, indexer response, and grab request models

use crate::models::{MediaType, Release, ReleaseProtocol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Indexer-side search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    Movie,
    TvSearch,
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchType::Movie => write!(f, "movie"),
            SearchType::TvSearch => write!(f, "tvsearch"),
        }
    }
}

/// Query handed to the indexer layer. Built by the executor, pure data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub query: String,
    pub search_type: SearchType,
    /// Newznab category ids; empty means no category filter.
    pub categories: Vec<i32>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<i32>,
    pub tvdb_id: Option<i32>,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub limit: Option<i32>,
}

/// Knobs the indexer layer applies while scoring and filtering candidates.
#[derive(Debug, Clone, Default)]
pub struct ScoringParams {
    pub min_seeders: Option<i32>,
}

/// One indexer round trip: the scored candidates plus the response
/// headers the rate limiter inspects for `Retry-After`.
#[derive(Debug, Clone, Default)]
pub struct IndexerResponse {
    pub releases: Vec<Release>,
    pub headers: HashMap<String, String>,
}

/// Handoff of a selected release to the download client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrabRequest {
    pub media_type: MediaType,
    pub media_id: i64,
    pub series_id: i64,
    pub title: String,
    pub download_url: String,
    pub guid: String,
    pub indexer_id: i32,
    pub protocol: ReleaseProtocol,
    pub quality_id: i32,
    pub category: String,
    pub is_season_pack: bool,
    pub is_complete_series: bool,
}

/// Outcome reported by the download client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrabReceipt {
    pub success: bool,
    pub client_name: String,
    pub download_id: String,
    /// Rejection reason when `success` is false.
    pub reason: Option<String>,
}
