//! Per-item and per-run search outcomes

use crate::models::Release;
use serde::{Deserialize, Serialize};

/// Terminal outcome of one search-and-grab pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub found: bool,
    pub downloaded: bool,
    pub upgraded: bool,
    pub release: Option<Release>,
    pub client_name: String,
    pub download_id: String,
    /// Empty on success.
    pub error: String,
}

impl SearchResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    /// A release was selected but the grab was left to another subsystem
    /// or rejected; `error` carries the rejection reason when there is one.
    pub fn found_only(release: Release) -> Self {
        Self {
            found: true,
            release: Some(release),
            ..Self::default()
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            error,
            ..Self::default()
        }
    }
}

/// Aggregate over one scheduled run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSearchResult {
    pub total_searched: usize,
    pub found: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub results: Vec<SearchResult>,
}
