//! Domain repositories
//!
//! Repository traits abstracting the persistent collaborators of the
//! auto-search engine. Implementations live in the infrastructure crate.

use crate::autosearch::AutoSearchConfig;
use crate::error::Result;
use crate::models::*;
use async_trait::async_trait;

/// Read-mostly view of the media library used to enumerate work.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Monitored movies without a file.
    async fn list_missing_movies(&self) -> Result<Vec<MovieRow>>;

    /// Monitored movies whose best file sits below the profile cutoff.
    /// Rows carry `current_quality_id`.
    async fn list_movie_upgrade_candidates(&self) -> Result<Vec<MovieRow>>;

    /// Monitored, released episodes without a file.
    async fn list_missing_episodes(&self) -> Result<Vec<EpisodeRow>>;

    /// Monitored episodes whose best file sits below the profile cutoff.
    async fn list_episode_upgrade_candidates(&self) -> Result<Vec<EpisodeRow>>;

    async fn get_season(&self, series_id: i64, season_number: i32) -> Result<Option<Season>>;

    async fn list_episodes_by_season(
        &self,
        series_id: i64,
        season_number: i32,
    ) -> Result<Vec<EpisodeRow>>;

    async fn count_movie_files(&self, movie_id: i64) -> Result<i64>;

    async fn count_episode_files(&self, episode_id: i64) -> Result<i64>;

    /// Transition a failed movie back to a searchable status
    /// (missing or upgradable, depending on file presence) and return it.
    async fn mark_movie_wanted(&self, movie_id: i64) -> Result<MediaStatus>;

    /// Episode counterpart of [`mark_movie_wanted`](Self::mark_movie_wanted).
    async fn mark_episode_wanted(&self, episode_id: i64) -> Result<MediaStatus>;
}

/// Persistent per-item failure counters.
///
/// Increments and resets are atomic with respect to concurrent runs;
/// the store provides this via SQL-level upsert/update.
#[async_trait]
pub trait BackoffRepository: Send + Sync {
    /// `None` when the item has never been attempted.
    async fn failure_count(
        &self,
        kind: BackoffKind,
        id: i64,
        purpose: SearchPurpose,
    ) -> Result<Option<i64>>;

    /// Create with count 1 or increment the existing record.
    async fn increment_failure(
        &self,
        kind: BackoffKind,
        id: i64,
        purpose: SearchPurpose,
    ) -> Result<()>;

    /// Set the count to 0.
    async fn reset_failure(&self, kind: BackoffKind, id: i64, purpose: SearchPurpose)
        -> Result<()>;
}

/// Fire-and-forget search history. Implementations log their own write
/// failures; a history outage never fails a search.
#[async_trait]
pub trait HistoryLogger: Send + Sync {
    async fn log_download(
        &self,
        item: &SearchableItem,
        release: &Release,
        client_name: &str,
        download_id: &str,
    );

    async fn log_failed(&self, item: &SearchableItem, error: &str);

    async fn log_status_changed(&self, kind: BackoffKind, id: i64, status: MediaStatus);
}

/// Persisted auto-search settings, one JSON record under a well-known key.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load_autosearch(&self) -> Result<Option<AutoSearchConfig>>;

    async fn save_autosearch(&self, config: &AutoSearchConfig) -> Result<()>;
}
