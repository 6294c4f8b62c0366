//! Searchable item domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media a search targets.
///
/// `Series` is reserved for whole-series batch searches; the scheduled
/// runner only ever produces the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Episode,
    Season,
    Series,
}

impl MediaType {
    /// Kind under which backoff records for this media type are keyed.
    /// Season packs are tracked against their series.
    pub fn backoff_kind(self) -> BackoffKind {
        match self {
            MediaType::Movie => BackoffKind::Movie,
            MediaType::Episode => BackoffKind::Episode,
            MediaType::Season | MediaType::Series => BackoffKind::Series,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Episode => write!(f, "episode"),
            MediaType::Season => write!(f, "season"),
            MediaType::Series => write!(f, "series"),
        }
    }
}

/// Why an item is being searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPurpose {
    Missing,
    Upgrade,
}

impl std::fmt::Display for SearchPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchPurpose::Missing => write!(f, "missing"),
            SearchPurpose::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Key kind for backoff records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Movie,
    Episode,
    Series,
}

impl std::fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffKind::Movie => write!(f, "movie"),
            BackoffKind::Episode => write!(f, "episode"),
            BackoffKind::Series => write!(f, "series"),
        }
    }
}

/// Library status of a movie or episode as far as searching is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    #[default]
    Missing,
    Upgradable,
    Downloading,
    Downloaded,
    Failed,
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaStatus::Missing => write!(f, "missing"),
            MediaStatus::Upgradable => write!(f, "upgradable"),
            MediaStatus::Downloading => write!(f, "downloading"),
            MediaStatus::Downloaded => write!(f, "downloaded"),
            MediaStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for MediaStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "missing" => Ok(MediaStatus::Missing),
            "upgradable" => Ok(MediaStatus::Upgradable),
            "downloading" => Ok(MediaStatus::Downloading),
            "downloaded" => Ok(MediaStatus::Downloaded),
            "failed" => Ok(MediaStatus::Failed),
            other => Err(format!("unknown media status: {}", other)),
        }
    }
}

/// The normalized unit of work handed to the search executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchableItem {
    pub media_type: MediaType,
    pub media_id: i64,
    /// Owning series for episodes and season packs; 0 for movies.
    pub series_id: i64,
    pub title: String,
    /// 0 when unknown.
    pub year: i32,
    /// 0 when not applicable.
    pub season_number: i32,
    /// 0 when not applicable.
    pub episode_number: i32,
    /// Empty string when unknown.
    pub imdb_id: String,
    pub tmdb_id: i32,
    pub tvdb_id: i32,
    pub quality_profile_id: i64,
    /// Upgrade context: when true the selector accepts only strictly
    /// better releases than `current_quality_id`.
    pub has_file: bool,
    pub current_quality_id: i32,
    /// Multi-slot mode target; ignored by the base engine.
    pub target_slot_id: Option<i64>,
}

impl SearchableItem {
    pub fn search_purpose(&self) -> SearchPurpose {
        if self.has_file {
            SearchPurpose::Upgrade
        } else {
            SearchPurpose::Missing
        }
    }

    /// Key used for the active-search registry and the grab lock.
    pub fn registry_key(&self) -> String {
        format!("{}:{}", self.media_type, self.media_id)
    }
}

/// A unit of work produced by the collector, ordered by release date.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub item: SearchableItem,
    pub release_date: DateTime<Utc>,
}
