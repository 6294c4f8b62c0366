//! Scheduled auto-search runs
//!
//! Single-flight executor over the collected work list. Items are
//! processed strictly sequentially, newest release first, paced by the
//! adaptive rate limiter and interruptible by the run's cancellation
//! token at every suspension point. The runner owns no timers; an
//! external scheduler (or the HTTP trigger surface) invokes it.

use crate::autosearch::backoff::BackoffClient;
use crate::autosearch::collector::ItemCollector;
use crate::autosearch::executor::SearchExecutor;
use crate::autosearch::rate_limit::AdaptiveRateLimiter;
use crate::error::{FetcharrError, Result};
use crate::events::{AutoSearchEvent, Broadcaster};
use crate::models::{BatchSearchResult, MediaType, SearchResult, SearchableItem, WorkItem};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which collections a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    All,
    MissingMovies,
    MissingEpisodes,
    UpgradeMovies,
    UpgradeEpisodes,
}

impl std::fmt::Display for RunScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunScope::All => write!(f, "all"),
            RunScope::MissingMovies => write!(f, "missing-movies"),
            RunScope::MissingEpisodes => write!(f, "missing-episodes"),
            RunScope::UpgradeMovies => write!(f, "upgrade-movies"),
            RunScope::UpgradeEpisodes => write!(f, "upgrade-episodes"),
        }
    }
}

/// Outcome of invoking the runner. Overlapping invocations are skipped,
/// never queued.
#[derive(Debug)]
pub enum RunOutcome {
    AlreadyRunning,
    Finished(BatchSearchResult),
}

pub struct SearchRunner {
    collector: ItemCollector,
    executor: Arc<SearchExecutor>,
    rate_limiter: Arc<AdaptiveRateLimiter>,
    backoff: BackoffClient,
    events: Option<Arc<dyn Broadcaster>>,
    running: AtomicBool,
}

impl SearchRunner {
    pub fn new(
        collector: ItemCollector,
        executor: Arc<SearchExecutor>,
        rate_limiter: Arc<AdaptiveRateLimiter>,
        backoff: BackoffClient,
        events: Option<Arc<dyn Broadcaster>>,
    ) -> Self {
        Self {
            collector,
            executor,
            rate_limiter,
            backoff,
            events,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn run_all(&self, cancel: CancellationToken) -> Result<RunOutcome> {
        self.run(RunScope::All, cancel).await
    }

    pub async fn run_missing_movies(&self, cancel: CancellationToken) -> Result<RunOutcome> {
        self.run(RunScope::MissingMovies, cancel).await
    }

    pub async fn run_missing_episodes(&self, cancel: CancellationToken) -> Result<RunOutcome> {
        self.run(RunScope::MissingEpisodes, cancel).await
    }

    pub async fn run_upgrade_movies(&self, cancel: CancellationToken) -> Result<RunOutcome> {
        self.run(RunScope::UpgradeMovies, cancel).await
    }

    pub async fn run_upgrade_episodes(&self, cancel: CancellationToken) -> Result<RunOutcome> {
        self.run(RunScope::UpgradeEpisodes, cancel).await
    }

    pub async fn run(&self, scope: RunScope, cancel: CancellationToken) -> Result<RunOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(%scope, "Auto-search already running, skipping");
            return Ok(RunOutcome::AlreadyRunning);
        }
        let result = self.run_locked(scope, &cancel).await;
        self.running.store(false, Ordering::SeqCst);
        result.map(RunOutcome::Finished)
    }

    async fn collect(&self, scope: RunScope, cancel: &CancellationToken) -> Result<Vec<WorkItem>> {
        match scope {
            RunScope::MissingMovies => self.collector.collect_missing_movies(cancel).await,
            RunScope::MissingEpisodes => self.collector.collect_missing_episodes(cancel).await,
            RunScope::UpgradeMovies => self.collector.collect_upgrade_movies(cancel).await,
            RunScope::UpgradeEpisodes => self.collector.collect_upgrade_episodes(cancel).await,
            RunScope::All => {
                let mut items = self.collector.collect_missing_movies(cancel).await?;
                items.extend(self.collector.collect_missing_episodes(cancel).await?);
                items.extend(self.collector.collect_upgrade_movies(cancel).await?);
                items.extend(self.collector.collect_upgrade_episodes(cancel).await?);
                Ok(items)
            }
        }
    }

    async fn run_locked(
        &self,
        scope: RunScope,
        cancel: &CancellationToken,
    ) -> Result<BatchSearchResult> {
        let started = Instant::now();
        let mut work = self.collect(scope, cancel).await?;
        // Newest first. The sort is stable, so ties keep collection order.
        work.sort_by(|a, b| b.release_date.cmp(&a.release_date));

        let total = work.len();
        info!(%scope, total, "Starting auto-search run");
        self.broadcast(AutoSearchEvent::TaskStarted { total_items: total });

        let mut batch = BatchSearchResult::default();
        for (index, work_item) in work.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(%scope, processed = batch.total_searched, "Run cancelled, stopping early");
                break;
            }
            let item = &work_item.item;
            self.broadcast(AutoSearchEvent::TaskProgress {
                current_item: index + 1,
                total_items: total,
                current_title: item.title.clone(),
            });

            // Pace between items, not before the first. The sleep is
            // interruptible by cancellation.
            if index > 0 {
                let wait = self.rate_limiter.delay();
                if !wait.is_zero() {
                    debug!(?wait, "Rate limit pause before next search");
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => continue,
                    }
                }
            }

            let item_started = Instant::now();
            let outcome = self.search_item(item, cancel).await;
            self.rate_limiter.record(item_started.elapsed(), None);
            self.settle(item, outcome, &mut batch, cancel).await;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.broadcast(AutoSearchEvent::TaskCompleted {
            total_searched: batch.total_searched,
            found: batch.found,
            downloaded: batch.downloaded,
            failed: batch.failed,
            elapsed_ms,
        });
        info!(
            %scope,
            total_searched = batch.total_searched,
            found = batch.found,
            downloaded = batch.downloaded,
            failed = batch.failed,
            elapsed_ms,
            "Auto-search run complete"
        );
        Ok(batch)
    }

    /// Dispatch by media type. Season packs route explicitly; the
    /// episode entry carries its own season-pack fallback.
    async fn search_item(
        &self,
        item: &SearchableItem,
        cancel: &CancellationToken,
    ) -> Result<SearchResult> {
        match item.media_type {
            MediaType::Movie | MediaType::Series => {
                self.executor.search_and_grab(item, cancel).await
            }
            MediaType::Episode => self.executor.search_episode(item, cancel).await,
            MediaType::Season => {
                if item.has_file {
                    self.executor.search_season_upgrade(item, cancel).await
                } else {
                    self.executor.search_and_grab(item, cancel).await
                }
            }
        }
    }

    /// Update counters and backoff for one terminal outcome.
    async fn settle(
        &self,
        item: &SearchableItem,
        outcome: Result<SearchResult>,
        batch: &mut BatchSearchResult,
        cancel: &CancellationToken,
    ) {
        let purpose = item.search_purpose();
        match outcome {
            // A cancelled item is not a terminal outcome: no counters,
            // no backoff. The loop exits at its next cancellation check;
            // a preempted item simply belongs to its preemptor now.
            Err(FetcharrError::Cancelled { key }) => {
                debug!(%key, run_cancelled = cancel.is_cancelled(), "Search cancelled mid-item");
            }
            Err(error) => {
                warn!(title = %item.title, %error, "Search failed");
                batch.total_searched += 1;
                batch.failed += 1;
                self.backoff
                    .record_failure(item.media_type, item.media_id, purpose)
                    .await;
                batch.results.push(SearchResult::failed(error.to_string()));
            }
            Ok(result) => {
                batch.total_searched += 1;
                if result.found {
                    batch.found += 1;
                }
                if result.downloaded {
                    batch.downloaded += 1;
                    self.backoff
                        .record_success(item.media_type, item.media_id, purpose)
                        .await;
                } else {
                    // no release, no acceptable release, or grab
                    // rejected: all count toward backoff
                    self.backoff
                        .record_failure(item.media_type, item.media_id, purpose)
                        .await;
                }
                batch.results.push(result);
            }
        }
    }

    fn broadcast(&self, event: AutoSearchEvent) {
        if let Some(events) = &self.events {
            events.broadcast(event);
        }
    }
}
