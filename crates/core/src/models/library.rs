//! Row types returned by the library store

use crate::models::MediaStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A movie row as enumerated for searching. Upgrade listings carry the
/// current quality; missing listings report 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    /// 0 when unknown.
    pub year: i32,
    pub imdb_id: Option<String>,
    pub tmdb_id: i32,
    pub quality_profile_id: i64,
    pub status: MediaStatus,
    pub physical_release: Option<DateTime<Utc>>,
    pub in_cinemas: Option<DateTime<Utc>>,
    /// Maximum quality id across the movie's files; 0 without a file.
    pub current_quality_id: i32,
}

/// An episode row as enumerated for searching, denormalized with the
/// series metadata the search criteria need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRow {
    pub id: i64,
    pub series_id: i64,
    pub series_title: String,
    /// First-aired year of the series; 0 when unknown.
    pub series_year: i32,
    pub season_number: i32,
    pub episode_number: i32,
    pub tvdb_id: i32,
    pub imdb_id: Option<String>,
    pub tmdb_id: i32,
    pub quality_profile_id: i64,
    pub status: MediaStatus,
    pub monitored: bool,
    pub air_date: Option<DateTime<Utc>>,
    pub has_file: bool,
    /// Maximum quality id across the episode's files; 0 without a file.
    pub current_quality_id: i32,
}

/// A season row, used by the season-pack eligibility oracles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub series_id: i64,
    pub season_number: i32,
    pub monitored: bool,
}
