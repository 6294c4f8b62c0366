//! Prowlarr API models and response types

use chrono::{DateTime, Utc};
use fetcharr_core::{Release, ReleaseProtocol};
use serde::{Deserialize, Serialize};

/// A scored search result as returned by the Prowlarr aggregation API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProwlarrSearchResult {
    /// Title of the release
    pub title: String,

    /// Download URL for the torrent/NZB file
    pub download_url: String,

    /// Unique identifier for the release
    pub guid: String,

    /// Info URL for the release page
    #[serde(default)]
    pub info_url: Option<String>,

    /// Indexer ID that provided this result
    pub indexer_id: i32,

    /// Transfer protocol
    #[serde(default = "default_protocol")]
    pub protocol: WireProtocol,

    /// Size of the release in bytes
    #[serde(default)]
    pub size: Option<i64>,

    /// Number of seeders (torrents only)
    #[serde(default)]
    pub seeders: Option<i32>,

    /// Normalized ranking score
    #[serde(default)]
    pub score: i32,

    /// Parsed quality descriptor
    pub quality: WireQuality,

    /// Parsed TV naming fields, absent for movie releases
    #[serde(default)]
    pub tv: Option<WireTvInfo>,

    /// Publication date
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireProtocol {
    Torrent,
    Usenet,
}

fn default_protocol() -> WireProtocol {
    WireProtocol::Torrent
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireQuality {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTvInfo {
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub end_season_number: Option<i32>,
    #[serde(default)]
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub full_season: bool,
}

impl From<ProwlarrSearchResult> for Release {
    fn from(result: ProwlarrSearchResult) -> Self {
        let tv = result.tv.unwrap_or_default();
        Release {
            guid: result.guid,
            indexer_id: result.indexer_id,
            title: result.title,
            download_url: result.download_url,
            info_url: result.info_url,
            protocol: match result.protocol {
                WireProtocol::Torrent => ReleaseProtocol::Torrent,
                WireProtocol::Usenet => ReleaseProtocol::Usenet,
            },
            size_bytes: result.size,
            seeders: result.seeders,
            score: result.score,
            quality_id: result.quality.id,
            quality_name: result.quality.name,
            season_number: tv.season_number,
            end_season_number: tv.end_season_number,
            episode_number: tv.episode_number,
            full_season: tv.full_season,
        }
    }
}
