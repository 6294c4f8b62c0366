//! PostgreSQL implementation of the library store and the season-pack
//! eligibility oracles
//!
//! Upgrade listings compute the current quality as MAX over the item's
//! file rows, so a duplicate file row can never drag the comparison
//! down to a lower quality.

use crate::database::DatabasePool;
use async_trait::async_trait;
use chrono::Utc;
use fetcharr_core::{
    EpisodeRow, FetcharrError, LibraryStore, MediaStatus, MovieRow, Result, Season,
    SeasonPackEligibility,
};
use sqlx::Row;

/// Movie columns shared by the two movie listings.
const MOVIE_COLUMNS: &str = "m.id, m.title, m.year, m.imdb_id, m.tmdb_id,
                             m.quality_profile_id, m.status, m.physical_release, m.in_cinemas";

/// Episode columns shared by the episode listings.
const EPISODE_COLUMNS: &str = "e.id, e.series_id, s.title AS series_title, s.year AS series_year,
                               e.season_number, e.episode_number, s.tvdb_id, s.imdb_id, s.tmdb_id,
                               s.quality_profile_id, e.status, e.monitored, e.air_date";

pub struct PostgresLibraryStore {
    pool: DatabasePool,
}

impl PostgresLibraryStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn parse_movie(row: &sqlx::postgres::PgRow) -> Result<MovieRow> {
        Ok(MovieRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            imdb_id: row.try_get("imdb_id")?,
            tmdb_id: row.try_get("tmdb_id")?,
            quality_profile_id: row.try_get("quality_profile_id")?,
            status: parse_status(&row.try_get::<String, _>("status")?)?,
            physical_release: row.try_get("physical_release")?,
            in_cinemas: row.try_get("in_cinemas")?,
            current_quality_id: row.try_get("current_quality_id")?,
        })
    }

    fn parse_episode(row: &sqlx::postgres::PgRow) -> Result<EpisodeRow> {
        Ok(EpisodeRow {
            id: row.try_get("id")?,
            series_id: row.try_get("series_id")?,
            series_title: row.try_get("series_title")?,
            series_year: row.try_get("series_year")?,
            season_number: row.try_get("season_number")?,
            episode_number: row.try_get("episode_number")?,
            tvdb_id: row.try_get("tvdb_id")?,
            imdb_id: row.try_get("imdb_id")?,
            tmdb_id: row.try_get("tmdb_id")?,
            quality_profile_id: row.try_get("quality_profile_id")?,
            status: parse_status(&row.try_get::<String, _>("status")?)?,
            monitored: row.try_get("monitored")?,
            air_date: row.try_get("air_date")?,
            has_file: row.try_get("has_file")?,
            current_quality_id: row.try_get("current_quality_id")?,
        })
    }
}

fn parse_status(value: &str) -> Result<MediaStatus> {
    value
        .parse()
        .map_err(|message: String| FetcharrError::DatabaseError { message })
}

#[async_trait]
impl LibraryStore for PostgresLibraryStore {
    async fn list_missing_movies(&self) -> Result<Vec<MovieRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVIE_COLUMNS}, 0 AS current_quality_id
             FROM movies m
             LEFT JOIN movie_files f ON f.movie_id = m.id
             WHERE m.monitored
             GROUP BY m.id
             HAVING COUNT(f.id) = 0
             ORDER BY m.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_movie).collect()
    }

    async fn list_movie_upgrade_candidates(&self) -> Result<Vec<MovieRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVIE_COLUMNS}, MAX(f.quality_id) AS current_quality_id
             FROM movies m
             JOIN movie_files f ON f.movie_id = m.id
             JOIN quality_profiles qp ON qp.id = m.quality_profile_id
             WHERE m.monitored AND qp.upgrade_allowed
             GROUP BY m.id, qp.cutoff_quality_id
             HAVING MAX(f.quality_id) < qp.cutoff_quality_id
             ORDER BY m.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_movie).collect()
    }

    async fn list_missing_episodes(&self) -> Result<Vec<EpisodeRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {EPISODE_COLUMNS}, FALSE AS has_file, 0 AS current_quality_id
             FROM episodes e
             JOIN series s ON s.id = e.series_id
             LEFT JOIN episode_files f ON f.episode_id = e.id
             WHERE e.monitored AND s.monitored
               AND e.air_date IS NOT NULL AND e.air_date <= now()
             GROUP BY e.id, s.id
             HAVING COUNT(f.id) = 0
             ORDER BY e.series_id, e.season_number, e.episode_number"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_episode).collect()
    }

    async fn list_episode_upgrade_candidates(&self) -> Result<Vec<EpisodeRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {EPISODE_COLUMNS}, TRUE AS has_file, MAX(f.quality_id) AS current_quality_id
             FROM episodes e
             JOIN series s ON s.id = e.series_id
             JOIN episode_files f ON f.episode_id = e.id
             JOIN quality_profiles qp ON qp.id = s.quality_profile_id
             WHERE e.monitored AND s.monitored AND qp.upgrade_allowed
             GROUP BY e.id, s.id, qp.cutoff_quality_id
             HAVING MAX(f.quality_id) < qp.cutoff_quality_id
             ORDER BY e.series_id, e.season_number, e.episode_number"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_episode).collect()
    }

    async fn get_season(&self, series_id: i64, season_number: i32) -> Result<Option<Season>> {
        let row = sqlx::query(
            "SELECT series_id, season_number, monitored
             FROM seasons
             WHERE series_id = $1 AND season_number = $2",
        )
        .bind(series_id)
        .bind(season_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Season {
                series_id: row.try_get("series_id")?,
                season_number: row.try_get("season_number")?,
                monitored: row.try_get("monitored")?,
            })
        })
        .transpose()
    }

    async fn list_episodes_by_season(
        &self,
        series_id: i64,
        season_number: i32,
    ) -> Result<Vec<EpisodeRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {EPISODE_COLUMNS}, COUNT(f.id) > 0 AS has_file,
                    COALESCE(MAX(f.quality_id), 0) AS current_quality_id
             FROM episodes e
             JOIN series s ON s.id = e.series_id
             LEFT JOIN episode_files f ON f.episode_id = e.id
             WHERE e.series_id = $1 AND e.season_number = $2
             GROUP BY e.id, s.id
             ORDER BY e.episode_number"
        ))
        .bind(series_id)
        .bind(season_number)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_episode).collect()
    }

    async fn count_movie_files(&self, movie_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM movie_files WHERE movie_id = $1")
            .bind(movie_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn count_episode_files(&self, episode_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM episode_files WHERE episode_id = $1")
            .bind(episode_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn mark_movie_wanted(&self, movie_id: i64) -> Result<MediaStatus> {
        let row = sqlx::query(
            "UPDATE movies m
             SET status = CASE
                 WHEN EXISTS (SELECT 1 FROM movie_files f WHERE f.movie_id = m.id)
                 THEN 'upgradable' ELSE 'missing'
             END,
             updated_at = now()
             WHERE m.id = $1
             RETURNING m.status",
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(FetcharrError::MovieNotFound { id: movie_id })?;
        parse_status(&row.try_get::<String, _>("status")?)
    }

    async fn mark_episode_wanted(&self, episode_id: i64) -> Result<MediaStatus> {
        let row = sqlx::query(
            "UPDATE episodes e
             SET status = CASE
                 WHEN EXISTS (SELECT 1 FROM episode_files f WHERE f.episode_id = e.id)
                 THEN 'upgradable' ELSE 'missing'
             END,
             updated_at = now()
             WHERE e.id = $1
             RETURNING e.status",
        )
        .bind(episode_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(FetcharrError::EpisodeNotFound { id: episode_id })?;
        parse_status(&row.try_get::<String, _>("status")?)
    }
}

#[async_trait]
impl SeasonPackEligibility for PostgresLibraryStore {
    async fn is_season_pack_eligible(&self, series_id: i64, season_number: i32) -> Result<bool> {
        let Some(season) = self.get_season(series_id, season_number).await? else {
            return Ok(false);
        };
        if !season.monitored {
            return Ok(false);
        }
        let episodes = self.list_episodes_by_season(series_id, season_number).await?;
        if episodes.len() <= 1 {
            return Ok(false);
        }
        let now = Utc::now();
        Ok(episodes.iter().all(|episode| {
            episode.monitored
                && episode.air_date.is_some_and(|aired| aired <= now)
                && !episode.has_file
        }))
    }

    async fn is_season_pack_upgrade_eligible(
        &self,
        series_id: i64,
        season_number: i32,
    ) -> Result<bool> {
        let Some(season) = self.get_season(series_id, season_number).await? else {
            return Ok(false);
        };
        if !season.monitored {
            return Ok(false);
        }
        let episodes = self.list_episodes_by_season(series_id, season_number).await?;
        if episodes.len() <= 1 {
            return Ok(false);
        }
        Ok(episodes
            .iter()
            .filter(|episode| episode.monitored)
            .all(|episode| episode.status == MediaStatus::Upgradable))
    }
}
