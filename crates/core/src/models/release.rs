//! Release candidate domain model

use serde::{Deserialize, Serialize};

/// Release protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseProtocol {
    Torrent,
    Usenet,
}

/// A scored release candidate returned by the indexer layer.
///
/// Candidates arrive pre-sorted by `score` descending; the engine never
/// re-ranks them. Parsing of the release name happens upstream, the
/// engine only consumes the parsed fields it needs for acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub guid: String,
    pub indexer_id: i32,
    pub title: String,
    pub download_url: String,
    pub info_url: Option<String>,
    pub protocol: ReleaseProtocol,
    pub size_bytes: Option<i64>,
    pub seeders: Option<i32>,

    /// Normalized score assigned by the indexer layer.
    pub score: i32,

    /// Parsed quality
    pub quality_id: i32,
    pub quality_name: String,

    /// Parsed TV fields; all `None`/false for movie releases.
    pub season_number: Option<i32>,
    /// Last season of a multi-season boxset, when parsed as one.
    pub end_season_number: Option<i32>,
    pub episode_number: Option<i32>,
    /// Whether the name parsed as a full-season release.
    pub full_season: bool,
}

impl Release {
    /// A season pack is a full-season release without a single-episode
    /// marker. Specials and single episodes never qualify.
    pub fn is_season_pack(&self) -> bool {
        self.full_season && self.episode_number.is_none()
    }

    /// A multi-season boxset spanning more than one season.
    pub fn is_complete_series(&self) -> bool {
        match (self.season_number, self.end_season_number) {
            (Some(start), Some(end)) => end > start,
            _ => false,
        }
    }

    /// Whether the parsed season (or boxset range) covers `season`.
    pub fn covers_season(&self, season: i32) -> bool {
        match (self.season_number, self.end_season_number) {
            (Some(start), Some(end)) => (start..=end).contains(&season),
            (Some(parsed), None) => parsed == season,
            (None, _) => false,
        }
    }
}
