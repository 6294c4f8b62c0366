//! HTTP trigger surface for the Fetcharr auto-search engine
//!
//! Five run verbs (one per runner entry point), per-item retry verbs,
//! and the auto-search settings endpoints.

pub mod error;
pub mod handlers;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use models::{CommandResponse, RetryResponse};

use axum::routing::{get, post};
use axum::Router;
use fetcharr_core::{BackoffClient, HistoryLogger, LibraryStore, SearchRunner, SettingsRepository};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub runner: Arc<SearchRunner>,
    pub backoff: BackoffClient,
    pub library: Arc<dyn LibraryStore>,
    pub history: Arc<dyn HistoryLogger>,
    pub settings: Arc<dyn SettingsRepository>,
}

/// Build the API router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/command/autosearch", post(handlers::commands::run_all))
        .route(
            "/api/v1/command/autosearch/movies/missing",
            post(handlers::commands::run_missing_movies),
        )
        .route(
            "/api/v1/command/autosearch/movies/upgrade",
            post(handlers::commands::run_upgrade_movies),
        )
        .route(
            "/api/v1/command/autosearch/episodes/missing",
            post(handlers::commands::run_missing_episodes),
        )
        .route(
            "/api/v1/command/autosearch/episodes/upgrade",
            post(handlers::commands::run_upgrade_episodes),
        )
        .route("/api/v1/movies/:id/retry", post(handlers::commands::retry_movie))
        .route(
            "/api/v1/series/:series_id/episodes/:episode_id/retry",
            post(handlers::commands::retry_episode),
        )
        .route(
            "/api/v1/settings/autosearch",
            get(handlers::settings::get_settings).put(handlers::settings::put_settings),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::extract::{Path, State};
    use axum::Json;
    use fetcharr_core::{
        ActiveSearchRegistry, AdaptiveRateLimiter, AutoSearchConfig, BackoffKind,
        BackoffRepository, EpisodeRow, FetcharrError, GrabClient, GrabReceipt, GrabRequest,
        Indexer, IndexerResponse, ItemCollector, KeyedLock, MediaStatus, MovieRow,
        QualityProfile, QualityService, Release, Result, ScoringParams, SearchCriteria,
        SearchExecutor, SearchPurpose, SearchableItem, Season, SeasonPackEligibility,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct EmptyLibrary;

    #[async_trait]
    impl LibraryStore for EmptyLibrary {
        async fn list_missing_movies(&self) -> Result<Vec<MovieRow>> {
            Ok(Vec::new())
        }
        async fn list_movie_upgrade_candidates(&self) -> Result<Vec<MovieRow>> {
            Ok(Vec::new())
        }
        async fn list_missing_episodes(&self) -> Result<Vec<EpisodeRow>> {
            Ok(Vec::new())
        }
        async fn list_episode_upgrade_candidates(&self) -> Result<Vec<EpisodeRow>> {
            Ok(Vec::new())
        }
        async fn get_season(&self, _series_id: i64, _season: i32) -> Result<Option<Season>> {
            Ok(None)
        }
        async fn list_episodes_by_season(
            &self,
            _series_id: i64,
            _season: i32,
        ) -> Result<Vec<EpisodeRow>> {
            Ok(Vec::new())
        }
        async fn count_movie_files(&self, _movie_id: i64) -> Result<i64> {
            Ok(0)
        }
        async fn count_episode_files(&self, _episode_id: i64) -> Result<i64> {
            Ok(0)
        }
        async fn mark_movie_wanted(&self, movie_id: i64) -> Result<MediaStatus> {
            if movie_id == 404 {
                return Err(FetcharrError::MovieNotFound { id: movie_id });
            }
            Ok(MediaStatus::Missing)
        }
        async fn mark_episode_wanted(&self, _episode_id: i64) -> Result<MediaStatus> {
            Ok(MediaStatus::Missing)
        }
    }

    struct NoEligibility;

    #[async_trait]
    impl SeasonPackEligibility for NoEligibility {
        async fn is_season_pack_eligible(&self, _series_id: i64, _season: i32) -> Result<bool> {
            Ok(false)
        }
        async fn is_season_pack_upgrade_eligible(
            &self,
            _series_id: i64,
            _season: i32,
        ) -> Result<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct MemoryBackoff {
        counts: Mutex<HashMap<(BackoffKind, i64, SearchPurpose), i64>>,
    }

    #[async_trait]
    impl BackoffRepository for MemoryBackoff {
        async fn failure_count(
            &self,
            kind: BackoffKind,
            id: i64,
            purpose: SearchPurpose,
        ) -> Result<Option<i64>> {
            Ok(self.counts.lock().unwrap().get(&(kind, id, purpose)).copied())
        }
        async fn increment_failure(
            &self,
            kind: BackoffKind,
            id: i64,
            purpose: SearchPurpose,
        ) -> Result<()> {
            *self
                .counts
                .lock()
                .unwrap()
                .entry((kind, id, purpose))
                .or_insert(0) += 1;
            Ok(())
        }
        async fn reset_failure(
            &self,
            kind: BackoffKind,
            id: i64,
            purpose: SearchPurpose,
        ) -> Result<()> {
            self.counts.lock().unwrap().insert((kind, id, purpose), 0);
            Ok(())
        }
    }

    struct EmptyIndexer;

    #[async_trait]
    impl Indexer for EmptyIndexer {
        async fn search_torrents(
            &self,
            _criteria: &SearchCriteria,
            _scoring: &ScoringParams,
        ) -> Result<IndexerResponse> {
            Ok(IndexerResponse::default())
        }
    }

    struct NoGrab;

    #[async_trait]
    impl GrabClient for NoGrab {
        async fn grab(&self, _request: &GrabRequest) -> Result<GrabReceipt> {
            Ok(GrabReceipt {
                success: true,
                client_name: "test".to_string(),
                download_id: "id".to_string(),
                reason: None,
            })
        }
    }

    struct AnyQuality;

    #[async_trait]
    impl QualityService for AnyQuality {
        async fn get_profile(&self, _id: i64) -> Result<QualityProfile> {
            Ok(QualityProfile::fallback())
        }
    }

    struct NoHistory;

    #[async_trait]
    impl fetcharr_core::HistoryLogger for NoHistory {
        async fn log_download(
            &self,
            _item: &SearchableItem,
            _release: &Release,
            _client: &str,
            _download_id: &str,
        ) {
        }
        async fn log_failed(&self, _item: &SearchableItem, _error: &str) {}
        async fn log_status_changed(&self, _kind: BackoffKind, _id: i64, _status: MediaStatus) {}
    }

    #[derive(Default)]
    struct MemorySettings {
        stored: Mutex<Option<AutoSearchConfig>>,
    }

    #[async_trait]
    impl SettingsRepository for MemorySettings {
        async fn load_autosearch(&self) -> Result<Option<AutoSearchConfig>> {
            Ok(self.stored.lock().unwrap().clone())
        }
        async fn save_autosearch(&self, config: &AutoSearchConfig) -> Result<()> {
            *self.stored.lock().unwrap() = Some(config.clone());
            Ok(())
        }
    }

    fn state() -> (ApiState, Arc<MemoryBackoff>, Arc<MemorySettings>) {
        let library: Arc<dyn LibraryStore> = Arc::new(EmptyLibrary);
        let backoff_repo = Arc::new(MemoryBackoff::default());
        let backoff = BackoffClient::new(backoff_repo.clone(), 3);
        let settings = Arc::new(MemorySettings::default());
        let rate_limiter = Arc::new(AdaptiveRateLimiter::new(Duration::ZERO));
        let executor = Arc::new(SearchExecutor::new(
            Arc::new(ActiveSearchRegistry::new()),
            Arc::new(EmptyIndexer),
            Arc::new(AnyQuality),
            Arc::new(NoGrab),
            Arc::new(KeyedLock::new()),
            rate_limiter.clone(),
            library.clone(),
            Arc::new(NoHistory),
            None,
        ));
        let collector =
            ItemCollector::new(library.clone(), Arc::new(NoEligibility), backoff.clone());
        let runner = Arc::new(SearchRunner::new(
            collector,
            executor,
            rate_limiter,
            backoff.clone(),
            None,
        ));
        (
            ApiState {
                runner,
                backoff,
                library,
                history: Arc::new(NoHistory),
                settings: settings.clone(),
            },
            backoff_repo,
            settings,
        )
    }

    #[tokio::test]
    async fn trigger_acknowledges_and_starts_a_run() {
        let (state, _, _) = state();
        let (status, Json(body)) = handlers::commands::run_all(State(state))
            .await
            .unwrap();
        assert_eq!(status, axum::http::StatusCode::ACCEPTED);
        assert!(body.started);
    }

    #[tokio::test]
    async fn retry_movie_clears_backoff_and_resets_status() {
        let (state, backoff_repo, _) = state();
        backoff_repo.counts.lock().unwrap().insert(
            (BackoffKind::Movie, 7, SearchPurpose::Missing),
            5,
        );

        let Json(body) = handlers::commands::retry_movie(State(state), Path(7))
            .await
            .unwrap();
        assert_eq!(body.id, 7);
        assert_eq!(body.status, MediaStatus::Missing);
        assert_eq!(
            backoff_repo
                .counts
                .lock()
                .unwrap()
                .get(&(BackoffKind::Movie, 7, SearchPurpose::Missing)),
            Some(&0)
        );
    }

    #[tokio::test]
    async fn retry_episode_also_clears_series_backoff() {
        let (state, backoff_repo, _) = state();
        backoff_repo.counts.lock().unwrap().insert(
            (BackoffKind::Series, 42, SearchPurpose::Missing),
            4,
        );

        handlers::commands::retry_episode(State(state), Path((42, 100)))
            .await
            .unwrap();
        assert_eq!(
            backoff_repo
                .counts
                .lock()
                .unwrap()
                .get(&(BackoffKind::Series, 42, SearchPurpose::Missing)),
            Some(&0)
        );
    }

    #[tokio::test]
    async fn unknown_movie_retry_is_a_not_found() {
        let (state, _, _) = state();
        let result = handlers::commands::retry_movie(State(state), Path(404)).await;
        assert!(matches!(
            result,
            Err(ApiError::Core(FetcharrError::MovieNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn settings_round_trip_and_default() {
        let (state, _, settings) = state();

        let Json(config) = handlers::settings::get_settings(State(state.clone()))
            .await
            .unwrap();
        assert_eq!(config, AutoSearchConfig::default());

        let updated = AutoSearchConfig {
            interval_hours: 6,
            backoff_threshold: 2,
            ..AutoSearchConfig::default()
        };
        handlers::settings::put_settings(State(state), Json(updated.clone()))
            .await
            .unwrap();
        assert_eq!(*settings.stored.lock().unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let (state, _, settings) = state();
        let bad = AutoSearchConfig {
            interval_hours: 0,
            ..AutoSearchConfig::default()
        };
        let result = handlers::settings::put_settings(State(state), Json(bad)).await;
        assert!(result.is_err());
        assert!(settings.stored.lock().unwrap().is_none());
    }
}
