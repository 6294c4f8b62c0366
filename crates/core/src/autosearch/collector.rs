//! Work-item collection for scheduled runs
//!
//! Enumerates missing and upgrade-candidate movies and episodes from
//! the library store, applies the backoff gate, and aggregates eligible
//! seasons into season-pack items. Read-only on the library.

use crate::autosearch::backoff::BackoffClient;
use crate::domain::{LibraryStore, SeasonPackEligibility};
use crate::error::Result;
use crate::models::{
    BackoffKind, EpisodeRow, MediaStatus, MediaType, MovieRow, SearchPurpose, SearchableItem,
    WorkItem,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Tracks `(kind, id, purpose)` keys already emitted in this run so no
/// item is processed twice, and so one series yields at most one
/// season-pack item per purpose per run.
type EmittedKeys = HashSet<(BackoffKind, i64, SearchPurpose)>;

pub struct ItemCollector {
    library: Arc<dyn LibraryStore>,
    eligibility: Arc<dyn SeasonPackEligibility>,
    backoff: BackoffClient,
}

impl ItemCollector {
    pub fn new(
        library: Arc<dyn LibraryStore>,
        eligibility: Arc<dyn SeasonPackEligibility>,
        backoff: BackoffClient,
    ) -> Self {
        Self {
            library,
            eligibility,
            backoff,
        }
    }

    pub async fn collect_missing_movies(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItem>> {
        let rows = self.library.list_missing_movies().await?;
        self.collect_movies(rows, SearchPurpose::Missing, cancel).await
    }

    pub async fn collect_upgrade_movies(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItem>> {
        let rows = self.library.list_movie_upgrade_candidates().await?;
        self.collect_movies(rows, SearchPurpose::Upgrade, cancel).await
    }

    pub async fn collect_missing_episodes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItem>> {
        let rows = self.library.list_missing_episodes().await?;
        self.collect_episodes(rows, SearchPurpose::Missing, cancel)
            .await
    }

    pub async fn collect_upgrade_episodes(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItem>> {
        let rows = self.library.list_episode_upgrade_candidates().await?;
        self.collect_episodes(rows, SearchPurpose::Upgrade, cancel)
            .await
    }

    async fn collect_movies(
        &self,
        rows: Vec<MovieRow>,
        purpose: SearchPurpose,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItem>> {
        let mut items = Vec::new();
        let mut emitted = EmittedKeys::new();

        for row in rows {
            if cancel.is_cancelled() {
                break;
            }
            if row.status == MediaStatus::Failed {
                continue;
            }
            if self.skip_by_backoff(BackoffKind::Movie, row.id, purpose).await {
                continue;
            }
            if !emitted.insert((BackoffKind::Movie, row.id, purpose)) {
                continue;
            }
            items.push(WorkItem {
                release_date: movie_release_date(&row),
                item: movie_item(&row, purpose),
            });
        }
        Ok(items)
    }

    async fn collect_episodes(
        &self,
        rows: Vec<EpisodeRow>,
        purpose: SearchPurpose,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkItem>> {
        // Group candidates by season; failed rows never take part.
        let mut groups: BTreeMap<(i64, i32), Vec<EpisodeRow>> = BTreeMap::new();
        for row in rows {
            if row.status == MediaStatus::Failed {
                continue;
            }
            groups
                .entry((row.series_id, row.season_number))
                .or_default()
                .push(row);
        }

        let mut items = Vec::new();
        let mut emitted = EmittedKeys::new();

        for ((series_id, season_number), mut group) in groups {
            if cancel.is_cancelled() {
                break;
            }
            group.sort_by_key(|row| row.episode_number);

            if self.season_pack_eligible(series_id, season_number, purpose).await {
                // One pack item replaces the group. If the series-level
                // backoff is at threshold the whole group sits this run out.
                if self
                    .skip_by_backoff(BackoffKind::Series, series_id, purpose)
                    .await
                {
                    continue;
                }
                if !emitted.insert((BackoffKind::Series, series_id, purpose)) {
                    debug!(
                        series_id,
                        season_number, "Season pack already emitted for this series, deferring"
                    );
                    continue;
                }
                let first = &group[0];
                items.push(WorkItem {
                    release_date: air_date_or_epoch(first),
                    item: season_pack_item(first, &group, purpose),
                });
            } else {
                for row in &group {
                    if self.skip_by_backoff(BackoffKind::Episode, row.id, purpose).await {
                        continue;
                    }
                    if !emitted.insert((BackoffKind::Episode, row.id, purpose)) {
                        continue;
                    }
                    items.push(WorkItem {
                        release_date: air_date_or_epoch(row),
                        item: episode_item(row, purpose),
                    });
                }
            }
        }
        Ok(items)
    }

    async fn season_pack_eligible(
        &self,
        series_id: i64,
        season_number: i32,
        purpose: SearchPurpose,
    ) -> bool {
        let result = match purpose {
            SearchPurpose::Missing => {
                self.eligibility
                    .is_season_pack_eligible(series_id, season_number)
                    .await
            }
            SearchPurpose::Upgrade => {
                self.eligibility
                    .is_season_pack_upgrade_eligible(series_id, season_number)
                    .await
            }
        };
        match result {
            Ok(eligible) => eligible,
            Err(error) => {
                // degrade to per-episode items
                warn!(series_id, season_number, %error, "Season pack eligibility check failed");
                false
            }
        }
    }

    /// Backoff read errors fail open: a misbehaving store must never
    /// stall collection.
    async fn skip_by_backoff(&self, kind: BackoffKind, id: i64, purpose: SearchPurpose) -> bool {
        match self.backoff.should_skip(kind, id, purpose).await {
            Ok(skip) => skip,
            Err(error) => {
                warn!(%kind, id, %purpose, %error, "Backoff lookup failed, treating item as searchable");
                false
            }
        }
    }
}

fn movie_item(row: &MovieRow, purpose: SearchPurpose) -> SearchableItem {
    SearchableItem {
        media_type: MediaType::Movie,
        media_id: row.id,
        series_id: 0,
        title: row.title.clone(),
        year: row.year,
        season_number: 0,
        episode_number: 0,
        imdb_id: row.imdb_id.clone().unwrap_or_default(),
        tmdb_id: row.tmdb_id,
        tvdb_id: 0,
        quality_profile_id: row.quality_profile_id,
        has_file: purpose == SearchPurpose::Upgrade,
        current_quality_id: row.current_quality_id,
        target_slot_id: None,
    }
}

fn episode_item(row: &EpisodeRow, purpose: SearchPurpose) -> SearchableItem {
    SearchableItem {
        media_type: MediaType::Episode,
        media_id: row.id,
        series_id: row.series_id,
        title: row.series_title.clone(),
        year: row.series_year,
        season_number: row.season_number,
        episode_number: row.episode_number,
        imdb_id: row.imdb_id.clone().unwrap_or_default(),
        tmdb_id: row.tmdb_id,
        tvdb_id: row.tvdb_id,
        quality_profile_id: row.quality_profile_id,
        has_file: purpose == SearchPurpose::Upgrade,
        current_quality_id: row.current_quality_id,
        target_slot_id: None,
    }
}

/// Metadata comes from any member episode; the upgrade quality context
/// is the best quality anywhere in the season, so duplicate file rows
/// cannot drag the comparison down.
fn season_pack_item(first: &EpisodeRow, group: &[EpisodeRow], purpose: SearchPurpose) -> SearchableItem {
    let current_quality_id = group
        .iter()
        .map(|row| row.current_quality_id)
        .max()
        .unwrap_or(0);
    SearchableItem {
        media_type: MediaType::Season,
        media_id: first.series_id,
        series_id: first.series_id,
        title: first.series_title.clone(),
        year: first.series_year,
        season_number: first.season_number,
        episode_number: 0,
        imdb_id: first.imdb_id.clone().unwrap_or_default(),
        tmdb_id: first.tmdb_id,
        tvdb_id: first.tvdb_id,
        quality_profile_id: first.quality_profile_id,
        has_file: purpose == SearchPurpose::Upgrade,
        current_quality_id,
        target_slot_id: None,
    }
}

fn movie_release_date(row: &MovieRow) -> DateTime<Utc> {
    row.physical_release
        .or(row.in_cinemas)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn air_date_or_epoch(row: &EpisodeRow) -> DateTime<Utc> {
    row.air_date.unwrap_or(DateTime::UNIX_EPOCH)
}
