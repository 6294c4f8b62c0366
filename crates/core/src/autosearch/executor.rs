//! Per-item search-and-grab pipeline
//!
//! One call drives the whole pipeline for an item: register in the
//! active-search registry (preempting any prior search for the same
//! item), query the indexer layer, select the best acceptable release,
//! and hand it to the download client under the process-wide grab lock.
//! Progress is broadcast and history is logged on every terminal path.

use crate::autosearch::criteria::build_search_criteria;
use crate::autosearch::rate_limit::AdaptiveRateLimiter;
use crate::autosearch::registry::ActiveSearchRegistry;
use crate::autosearch::selector::select_best_release;
use crate::domain::{GrabClient, HistoryLogger, Indexer, LibraryStore, QualityService};
use crate::error::{FetcharrError, Result};
use crate::events::{AutoSearchEvent, Broadcaster};
use crate::grab_lock::KeyedLock;
use crate::models::{
    EpisodeRow, GrabRequest, MediaStatus, MediaType, QualityProfile, Release, ScoringParams,
    SearchResult, SearchableItem,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source tag carried on per-item started events.
const EVENT_SOURCE: &str = "auto";

pub struct SearchExecutor {
    registry: Arc<ActiveSearchRegistry>,
    indexer: Arc<dyn Indexer>,
    quality: Arc<dyn QualityService>,
    grab_client: Arc<dyn GrabClient>,
    grab_lock: Arc<KeyedLock>,
    rate_limiter: Arc<AdaptiveRateLimiter>,
    library: Arc<dyn LibraryStore>,
    history: Arc<dyn HistoryLogger>,
    events: Option<Arc<dyn Broadcaster>>,
    scoring: ScoringParams,
}

impl SearchExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ActiveSearchRegistry>,
        indexer: Arc<dyn Indexer>,
        quality: Arc<dyn QualityService>,
        grab_client: Arc<dyn GrabClient>,
        grab_lock: Arc<KeyedLock>,
        rate_limiter: Arc<AdaptiveRateLimiter>,
        library: Arc<dyn LibraryStore>,
        history: Arc<dyn HistoryLogger>,
        events: Option<Arc<dyn Broadcaster>>,
    ) -> Self {
        Self {
            registry,
            indexer,
            quality,
            grab_client,
            grab_lock,
            rate_limiter,
            library,
            history,
            events,
            scoring: ScoringParams::default(),
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringParams) -> Self {
        self.scoring = scoring;
        self
    }

    /// Run the full pipeline for one item. Registration preempts any
    /// in-flight search for the same `(media_type, media_id)`; the entry
    /// is removed again on every exit path.
    pub async fn search_and_grab(
        &self,
        item: &SearchableItem,
        run_token: &CancellationToken,
    ) -> Result<SearchResult> {
        let handle = self.registry.register(&item.registry_key());
        let result = self.run_pipeline(item, run_token, &handle.token).await;
        self.registry.unregister(&handle);
        result
    }

    /// Episode entry point. When the first episode of a season finds
    /// nothing and this is not an upgrade, a season-pack search for the
    /// same season is attempted before giving up.
    pub async fn search_episode(
        &self,
        item: &SearchableItem,
        run_token: &CancellationToken,
    ) -> Result<SearchResult> {
        let result = self.search_and_grab(item, run_token).await?;
        if !result.found && item.episode_number == 1 && !item.has_file {
            debug!(
                series_id = item.series_id,
                season = item.season_number,
                "Episode search empty, trying a season pack"
            );
            let pack = season_item_from_episode(item);
            return self.search_and_grab(&pack, run_token).await;
        }
        Ok(result)
    }

    /// Season-pack upgrade entry point. Tries the pack first; when it
    /// does not end in a grab, upgrades the season's episodes one by
    /// one. The aggregate collapses to a single result carrying the
    /// first successfully downloaded member.
    pub async fn search_season_upgrade(
        &self,
        item: &SearchableItem,
        run_token: &CancellationToken,
    ) -> Result<SearchResult> {
        let pack_result = match self.search_and_grab(item, run_token).await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                warn!(
                    series_id = item.series_id,
                    season = item.season_number,
                    %error,
                    "Season pack upgrade search failed, falling back to episodes"
                );
                SearchResult::failed(error.to_string())
            }
        };
        if pack_result.downloaded {
            return Ok(SearchResult {
                upgraded: true,
                ..pack_result
            });
        }

        let episodes = self
            .library
            .list_episodes_by_season(item.series_id, item.season_number)
            .await?;

        let mut any_found = pack_result.found;
        let mut collapsed: Option<SearchResult> = None;
        for episode in episodes
            .iter()
            .filter(|episode| {
                episode.monitored && episode.has_file && episode.status == MediaStatus::Upgradable
            })
        {
            if run_token.is_cancelled() {
                break;
            }
            let episode_item = upgrade_item_from_episode(episode, item);
            match self.search_and_grab(&episode_item, run_token).await {
                Ok(result) => {
                    any_found |= result.found;
                    if result.downloaded && collapsed.is_none() {
                        collapsed = Some(SearchResult {
                            upgraded: true,
                            ..result
                        });
                    }
                }
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => {
                    warn!(episode_id = episode.id, %error, "Episode upgrade fallback failed");
                }
            }
        }

        Ok(collapsed.unwrap_or(SearchResult {
            found: any_found,
            ..pack_result
        }))
    }

    async fn run_pipeline(
        &self,
        item: &SearchableItem,
        run_token: &CancellationToken,
        search_token: &CancellationToken,
    ) -> Result<SearchResult> {
        self.broadcast(AutoSearchEvent::SearchStarted {
            media_type: item.media_type,
            media_id: item.media_id,
            title: item.title.clone(),
            source: EVENT_SOURCE.to_string(),
        });

        let profile = match self.quality.get_profile(item.quality_profile_id).await {
            Ok(profile) => profile,
            Err(error) => {
                warn!(
                    profile_id = item.quality_profile_id,
                    %error,
                    "Quality profile lookup failed, using fallback profile"
                );
                QualityProfile::fallback()
            }
        };

        let criteria = build_search_criteria(item);
        debug!(
            query = %criteria.query,
            search_type = %criteria.search_type,
            "Querying indexers"
        );

        let started = Instant::now();
        let response = tokio::select! {
            result = self.indexer.search_torrents(&criteria, &self.scoring) => result,
            _ = run_token.cancelled() => return Err(self.cancelled(item)),
            _ = search_token.cancelled() => return Err(self.cancelled(item)),
        };
        let response = match response {
            Ok(response) => {
                self.rate_limiter
                    .record(started.elapsed(), Some(&response.headers));
                response
            }
            Err(error) => {
                self.fail(item, &error).await;
                return Err(error);
            }
        };

        if response.releases.is_empty() {
            debug!(title = %item.title, "Indexers returned no candidates");
            let result = SearchResult::not_found();
            self.broadcast_completed(item, &result);
            return Ok(result);
        }

        let selected = select_best_release(&response.releases, &profile, item).cloned();
        let Some(release) = selected else {
            debug!(
                title = %item.title,
                candidates = response.releases.len(),
                "No acceptable release among candidates"
            );
            let result = SearchResult::not_found();
            self.broadcast_completed(item, &result);
            return Ok(result);
        };

        // Exclude concurrent grabs from other subsystems (RSS sync,
        // manual grabs). No retry when held: the holder will grab.
        let lock_key = item.registry_key();
        if !self.grab_lock.try_acquire(&lock_key) {
            info!(key = %lock_key, "Grab lock held elsewhere, leaving the grab to its holder");
            let result = SearchResult::found_only(release);
            self.broadcast_completed(item, &result);
            return Ok(result);
        }

        let request = build_grab_request(item, &release);
        let grab = tokio::select! {
            result = self.grab_client.grab(&request) => result,
            _ = run_token.cancelled() => {
                self.grab_lock.release(&lock_key);
                return Err(self.cancelled(item));
            }
            _ = search_token.cancelled() => {
                self.grab_lock.release(&lock_key);
                return Err(self.cancelled(item));
            }
        };
        self.grab_lock.release(&lock_key);

        match grab {
            Err(error) => {
                self.fail(item, &error).await;
                Err(error)
            }
            Ok(receipt) if !receipt.success => {
                let reason = receipt
                    .reason
                    .unwrap_or_else(|| "download client rejected the release".to_string());
                warn!(title = %release.title, %reason, "Grab rejected");
                self.history.log_failed(item, &reason).await;
                let mut result = SearchResult::found_only(release);
                result.error = reason;
                self.broadcast_completed(item, &result);
                Ok(result)
            }
            Ok(receipt) => {
                info!(
                    title = %release.title,
                    client = %receipt.client_name,
                    download_id = %receipt.download_id,
                    "Release grabbed"
                );
                self.history
                    .log_download(item, &release, &receipt.client_name, &receipt.download_id)
                    .await;
                let result = SearchResult {
                    found: true,
                    downloaded: true,
                    upgraded: item.has_file,
                    release: Some(release),
                    client_name: receipt.client_name,
                    download_id: receipt.download_id,
                    error: String::new(),
                };
                self.broadcast_completed(item, &result);
                Ok(result)
            }
        }
    }

    fn cancelled(&self, item: &SearchableItem) -> FetcharrError {
        FetcharrError::Cancelled {
            key: item.registry_key(),
        }
    }

    async fn fail(&self, item: &SearchableItem, error: &FetcharrError) {
        self.broadcast(AutoSearchEvent::SearchFailed {
            media_type: item.media_type,
            media_id: item.media_id,
            title: item.title.clone(),
            error: error.to_string(),
        });
        self.history.log_failed(item, &error.to_string()).await;
    }

    fn broadcast(&self, event: AutoSearchEvent) {
        if let Some(events) = &self.events {
            events.broadcast(event);
        }
    }

    fn broadcast_completed(&self, item: &SearchableItem, result: &SearchResult) {
        self.broadcast(AutoSearchEvent::SearchCompleted {
            media_type: item.media_type,
            media_id: item.media_id,
            title: item.title.clone(),
            found: result.found,
            downloaded: result.downloaded,
            upgraded: result.upgraded,
            release_name: result.release.as_ref().map(|release| release.title.clone()),
            client_name: (!result.client_name.is_empty()).then(|| result.client_name.clone()),
        });
    }
}

fn build_grab_request(item: &SearchableItem, release: &Release) -> GrabRequest {
    let category = match item.media_type {
        MediaType::Movie => "movies",
        _ => "tv",
    };
    GrabRequest {
        media_type: item.media_type,
        media_id: item.media_id,
        series_id: item.series_id,
        title: release.title.clone(),
        download_url: release.download_url.clone(),
        guid: release.guid.clone(),
        indexer_id: release.indexer_id,
        protocol: release.protocol,
        quality_id: release.quality_id,
        category: category.to_string(),
        is_season_pack: matches!(item.media_type, MediaType::Season | MediaType::Series),
        is_complete_series: release.is_complete_series(),
    }
}

/// Season-pack item derived from an episode item, for the episode-1
/// fallback. The pack inherits the episode's series metadata.
fn season_item_from_episode(item: &SearchableItem) -> SearchableItem {
    SearchableItem {
        media_type: MediaType::Season,
        media_id: item.series_id,
        episode_number: 0,
        has_file: false,
        current_quality_id: 0,
        ..item.clone()
    }
}

fn upgrade_item_from_episode(episode: &EpisodeRow, season_item: &SearchableItem) -> SearchableItem {
    SearchableItem {
        media_type: MediaType::Episode,
        media_id: episode.id,
        series_id: episode.series_id,
        title: season_item.title.clone(),
        year: season_item.year,
        season_number: episode.season_number,
        episode_number: episode.episode_number,
        imdb_id: season_item.imdb_id.clone(),
        tmdb_id: season_item.tmdb_id,
        tvdb_id: season_item.tvdb_id,
        quality_profile_id: episode.quality_profile_id,
        has_file: true,
        current_quality_id: episode.current_quality_id,
        target_slot_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BackoffKind, GrabReceipt, IndexerResponse, MovieRow, ReleaseProtocol, Season,
        SearchCriteria,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct StubIndexer {
        responses: Mutex<VecDeque<Result<IndexerResponse>>>,
        criteria_log: Mutex<Vec<SearchCriteria>>,
        hang: bool,
    }

    impl StubIndexer {
        fn with(responses: Vec<Result<IndexerResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                criteria_log: Mutex::new(Vec::new()),
                hang: false,
            }
        }

        fn hanging() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                criteria_log: Mutex::new(Vec::new()),
                hang: true,
            }
        }
    }

    #[async_trait]
    impl Indexer for StubIndexer {
        async fn search_torrents(
            &self,
            criteria: &SearchCriteria,
            _scoring: &ScoringParams,
        ) -> Result<IndexerResponse> {
            self.criteria_log.lock().unwrap().push(criteria.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(IndexerResponse::default()))
        }
    }

    #[derive(Default)]
    struct StubGrabClient {
        receipts: Mutex<VecDeque<Result<GrabReceipt>>>,
        requests: Mutex<Vec<GrabRequest>>,
    }

    impl StubGrabClient {
        fn with(receipts: Vec<Result<GrabReceipt>>) -> Self {
            Self {
                receipts: Mutex::new(receipts.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GrabClient for StubGrabClient {
        async fn grab(&self, request: &GrabRequest) -> Result<GrabReceipt> {
            self.requests.lock().unwrap().push(request.clone());
            self.receipts.lock().unwrap().pop_front().unwrap_or(Ok(GrabReceipt {
                success: true,
                client_name: "stub".to_string(),
                download_id: "dl".to_string(),
                reason: None,
            }))
        }
    }

    struct StaticQuality(QualityProfile);

    #[async_trait]
    impl QualityService for StaticQuality {
        async fn get_profile(&self, _id: i64) -> Result<QualityProfile> {
            Ok(self.0.clone())
        }
    }

    struct FailingQuality;

    #[async_trait]
    impl QualityService for FailingQuality {
        async fn get_profile(&self, id: i64) -> Result<QualityProfile> {
            Err(FetcharrError::InvalidQualityProfile {
                profile: id.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct NoopHistory;

    #[async_trait]
    impl HistoryLogger for NoopHistory {
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
    struct RecordingBroadcaster {
        events: Mutex<Vec<AutoSearchEvent>>,
    }

    impl Broadcaster for RecordingBroadcaster {
        fn broadcast(&self, event: AutoSearchEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[derive(Default)]
    struct FakeLibrary {
        episodes: Vec<EpisodeRow>,
    }

    #[async_trait]
    impl LibraryStore for FakeLibrary {
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
        async fn get_season(&self, series_id: i64, season_number: i32) -> Result<Option<Season>> {
            Ok(Some(Season {
                series_id,
                season_number,
                monitored: true,
            }))
        }
        async fn list_episodes_by_season(
            &self,
            series_id: i64,
            season_number: i32,
        ) -> Result<Vec<EpisodeRow>> {
            Ok(self
                .episodes
                .iter()
                .filter(|row| row.series_id == series_id && row.season_number == season_number)
                .cloned()
                .collect())
        }
        async fn count_movie_files(&self, _movie_id: i64) -> Result<i64> {
            Ok(0)
        }
        async fn count_episode_files(&self, _episode_id: i64) -> Result<i64> {
            Ok(0)
        }
        async fn mark_movie_wanted(&self, _movie_id: i64) -> Result<MediaStatus> {
            Ok(MediaStatus::Missing)
        }
        async fn mark_episode_wanted(&self, _episode_id: i64) -> Result<MediaStatus> {
            Ok(MediaStatus::Missing)
        }
    }

    struct Harness {
        executor: SearchExecutor,
        registry: Arc<ActiveSearchRegistry>,
        grab_lock: Arc<KeyedLock>,
        grab_client: Arc<StubGrabClient>,
        indexer: Arc<StubIndexer>,
        events: Arc<RecordingBroadcaster>,
    }

    fn harness(indexer: StubIndexer, grab_client: StubGrabClient) -> Harness {
        harness_with(indexer, grab_client, FakeLibrary::default(), any_profile())
    }

    fn harness_with(
        indexer: StubIndexer,
        grab_client: StubGrabClient,
        library: FakeLibrary,
        profile: QualityProfile,
    ) -> Harness {
        let registry = Arc::new(ActiveSearchRegistry::new());
        let grab_lock = Arc::new(KeyedLock::new());
        let grab_client = Arc::new(grab_client);
        let indexer = Arc::new(indexer);
        let events = Arc::new(RecordingBroadcaster::default());
        let executor = SearchExecutor::new(
            registry.clone(),
            indexer.clone(),
            Arc::new(StaticQuality(profile)),
            grab_client.clone(),
            grab_lock.clone(),
            Arc::new(AdaptiveRateLimiter::new(std::time::Duration::ZERO)),
            Arc::new(library),
            Arc::new(NoopHistory),
            Some(events.clone() as Arc<dyn Broadcaster>),
        );
        Harness {
            executor,
            registry,
            grab_lock,
            grab_client,
            indexer,
            events,
        }
    }

    fn any_profile() -> QualityProfile {
        QualityProfile {
            id: 1,
            name: "any".to_string(),
            allowed_quality_ids: Vec::new(),
            cutoff_quality_id: i32::MAX,
            upgrade_allowed: true,
        }
    }

    fn movie_item() -> SearchableItem {
        SearchableItem {
            media_type: MediaType::Movie,
            media_id: 7,
            series_id: 0,
            title: "M".to_string(),
            year: 2024,
            season_number: 0,
            episode_number: 0,
            imdb_id: String::new(),
            tmdb_id: 0,
            tvdb_id: 0,
            quality_profile_id: 1,
            has_file: false,
            current_quality_id: 0,
            target_slot_id: None,
        }
    }

    fn episode_one_item() -> SearchableItem {
        SearchableItem {
            media_type: MediaType::Episode,
            media_id: 100,
            series_id: 42,
            title: "Show".to_string(),
            year: 2020,
            season_number: 2,
            episode_number: 1,
            imdb_id: String::new(),
            tmdb_id: 0,
            tvdb_id: 555,
            quality_profile_id: 1,
            has_file: false,
            current_quality_id: 0,
            target_slot_id: None,
        }
    }

    fn movie_release() -> Release {
        Release {
            guid: "abc".to_string(),
            indexer_id: 1,
            title: "M.2024.1080p".to_string(),
            download_url: "magnet:?xt=test".to_string(),
            info_url: None,
            protocol: ReleaseProtocol::Torrent,
            size_bytes: None,
            seeders: Some(50),
            score: 100,
            quality_id: 1080,
            quality_name: "1080p".to_string(),
            season_number: None,
            end_season_number: None,
            episode_number: None,
            full_season: false,
        }
    }

    fn pack_release(season: i32) -> Release {
        Release {
            season_number: Some(season),
            full_season: true,
            title: format!("Show.S{:02}.1080p", season),
            ..movie_release()
        }
    }

    fn one_release(release: Release) -> Result<IndexerResponse> {
        Ok(IndexerResponse {
            releases: vec![release],
            headers: Default::default(),
        })
    }

    #[tokio::test]
    async fn grabbed_release_reports_downloaded() {
        let h = harness(
            StubIndexer::with(vec![one_release(movie_release())]),
            StubGrabClient::with(vec![Ok(GrabReceipt {
                success: true,
                client_name: "c".to_string(),
                download_id: "abc".to_string(),
                reason: None,
            })]),
        );

        let result = h
            .executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.found);
        assert!(result.downloaded);
        assert!(!result.upgraded);
        assert_eq!(result.client_name, "c");
        assert_eq!(result.download_id, "abc");

        // registry cleaned up, lock released
        assert!(!h.registry.is_searching(MediaType::Movie, 7));
        assert!(!h.grab_lock.is_held("movie:7"));

        let events = h.events.events.lock().unwrap();
        assert!(matches!(events[0], AutoSearchEvent::SearchStarted { .. }));
        assert!(matches!(
            events.last().unwrap(),
            AutoSearchEvent::SearchCompleted {
                found: true,
                downloaded: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn indexer_error_surfaces_and_broadcasts_failed() {
        let h = harness(
            StubIndexer::with(vec![Err(FetcharrError::IndexerError {
                message: "boom".to_string(),
            })]),
            StubGrabClient::default(),
        );

        let result = h
            .executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await;
        assert!(result.is_err());
        assert!(h.grab_client.requests.lock().unwrap().is_empty());

        let events = h.events.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|event| matches!(event, AutoSearchEvent::SearchFailed { .. })));
    }

    #[tokio::test]
    async fn empty_candidate_list_completes_as_not_found() {
        let h = harness(
            StubIndexer::with(vec![Ok(IndexerResponse::default())]),
            StubGrabClient::default(),
        );

        let result = h
            .executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.found);
        assert!(!result.downloaded);
        assert!(h.grab_client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upgrade_without_quality_improvement_selects_nothing() {
        let mut item = movie_item();
        item.has_file = true;
        item.current_quality_id = 1080;

        let h = harness_with(
            StubIndexer::with(vec![one_release(movie_release())]),
            StubGrabClient::default(),
            FakeLibrary::default(),
            QualityProfile {
                cutoff_quality_id: 2160,
                ..any_profile()
            },
        );

        let result = h
            .executor
            .search_and_grab(&item, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.found);
        assert!(h.grab_client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn held_grab_lock_skips_the_grab() {
        let h = harness(
            StubIndexer::with(vec![one_release(movie_release())]),
            StubGrabClient::default(),
        );
        assert!(h.grab_lock.try_acquire("movie:7"));

        let result = h
            .executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.found);
        assert!(!result.downloaded);
        assert!(h.grab_client.requests.lock().unwrap().is_empty());
        // the foreign holder keeps its lock
        assert!(h.grab_lock.is_held("movie:7"));
    }

    #[tokio::test]
    async fn rejected_grab_reports_found_not_downloaded() {
        let h = harness(
            StubIndexer::with(vec![one_release(movie_release())]),
            StubGrabClient::with(vec![Ok(GrabReceipt {
                success: false,
                client_name: "c".to_string(),
                download_id: String::new(),
                reason: Some("duplicate torrent".to_string()),
            })]),
        );

        let result = h
            .executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.found);
        assert!(!result.downloaded);
        assert_eq!(result.error, "duplicate torrent");
        assert!(!h.grab_lock.is_held("movie:7"));
    }

    #[tokio::test]
    async fn grab_transport_error_surfaces() {
        let h = harness(
            StubIndexer::with(vec![one_release(movie_release())]),
            StubGrabClient::with(vec![Err(FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: "connection refused".to_string(),
            })]),
        );

        let result = h
            .executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await;
        assert!(result.is_err());
        assert!(!h.grab_lock.is_held("movie:7"));
    }

    #[tokio::test]
    async fn missing_profile_falls_back_and_still_grabs() {
        let registry = Arc::new(ActiveSearchRegistry::new());
        let grab_client = Arc::new(StubGrabClient::default());
        let executor = SearchExecutor::new(
            registry,
            Arc::new(StubIndexer::with(vec![one_release(movie_release())])),
            Arc::new(FailingQuality),
            grab_client.clone(),
            Arc::new(KeyedLock::new()),
            Arc::new(AdaptiveRateLimiter::new(std::time::Duration::ZERO)),
            Arc::new(FakeLibrary::default()),
            Arc::new(NoopHistory),
            None,
        );

        let result = executor
            .search_and_grab(&movie_item(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.downloaded);
    }

    #[tokio::test]
    async fn reentry_preempts_a_search_suspended_in_the_indexer_call() {
        let h = harness(StubIndexer::hanging(), StubGrabClient::default());
        let executor = Arc::new(h.executor);

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .search_and_grab(&movie_item(), &CancellationToken::new())
                    .await
            })
        };
        // wait until the first search has registered
        while !h.registry.is_searching(MediaType::Movie, 7) {
            tokio::task::yield_now().await;
        }

        // hangs as well, but registration alone must preempt the first
        let second = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .search_and_grab(&movie_item(), &CancellationToken::new())
                    .await
            })
        };

        let first_result = first.await.unwrap();
        assert!(matches!(
            first_result,
            Err(FetcharrError::Cancelled { .. })
        ));
        assert!(h.registry.is_searching(MediaType::Movie, 7));

        assert!(h.registry.cancel(MediaType::Movie, 7));
        let second_result = second.await.unwrap();
        assert!(matches!(
            second_result,
            Err(FetcharrError::Cancelled { .. })
        ));
    }

    #[tokio::test]
    async fn run_cancellation_aborts_the_indexer_call() {
        let h = harness(StubIndexer::hanging(), StubGrabClient::default());
        let run_token = CancellationToken::new();
        run_token.cancel();

        let result = h.executor.search_and_grab(&movie_item(), &run_token).await;
        assert!(matches!(result, Err(FetcharrError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn first_episode_falls_back_to_a_season_pack() {
        let h = harness(
            StubIndexer::with(vec![
                Ok(IndexerResponse::default()),
                one_release(pack_release(2)),
            ]),
            StubGrabClient::default(),
        );

        let result = h
            .executor
            .search_episode(&episode_one_item(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.downloaded);

        let requests = h.grab_client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].is_season_pack);
        assert_eq!(requests[0].media_id, 42);
    }

    #[tokio::test]
    async fn upgrade_episode_never_falls_back_to_a_pack() {
        let mut item = episode_one_item();
        item.has_file = true;
        item.current_quality_id = 720;

        let h = harness(
            StubIndexer::with(vec![Ok(IndexerResponse::default())]),
            StubGrabClient::default(),
        );

        let result = h
            .executor
            .search_episode(&item, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.found);
        // only the episode search ran, no second query for a pack
        assert_eq!(h.indexer.criteria_log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn season_upgrade_falls_back_to_episodes_and_collapses() {
        let episode_row = |id: i64, number: i32| EpisodeRow {
            id,
            series_id: 42,
            series_title: "Show".to_string(),
            series_year: 2020,
            season_number: 2,
            episode_number: number,
            tvdb_id: 555,
            imdb_id: None,
            tmdb_id: 0,
            quality_profile_id: 1,
            status: MediaStatus::Upgradable,
            monitored: true,
            air_date: None,
            has_file: true,
            current_quality_id: 720,
        };
        let library = FakeLibrary {
            episodes: vec![episode_row(100, 1), episode_row(101, 2)],
        };

        let mut episode_release = movie_release();
        episode_release.season_number = Some(2);
        episode_release.episode_number = Some(1);

        let mut second_release = movie_release();
        second_release.guid = "second".to_string();
        second_release.season_number = Some(2);
        second_release.episode_number = Some(2);

        // pack search comes back empty, both episode searches hit
        let h = harness_with(
            StubIndexer::with(vec![
                Ok(IndexerResponse::default()),
                one_release(episode_release),
                one_release(second_release),
            ]),
            StubGrabClient::default(),
            library,
            any_profile(),
        );

        let mut item = movie_item();
        item.media_type = MediaType::Season;
        item.media_id = 42;
        item.series_id = 42;
        item.season_number = 2;
        item.has_file = true;
        item.current_quality_id = 720;

        let result = h
            .executor
            .search_season_upgrade(&item, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.downloaded);
        assert!(result.upgraded);
        // collapsed to the first downloaded member
        assert_eq!(result.release.unwrap().guid, "abc");
        // but both episodes were grabbed
        assert_eq!(h.grab_client.requests.lock().unwrap().len(), 2);
    }
}
