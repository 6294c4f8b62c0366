//! Failure backoff gate
//!
//! Thin threshold-aware client over the persistent backoff store. Every
//! unsuccessful terminal outcome for an item increments its counter;
//! a successful grab resets it. Items at or above the threshold are
//! skipped during collection until a reset unblocks them.

use crate::domain::BackoffRepository;
use crate::error::Result;
use crate::models::{BackoffKind, MediaType, SearchPurpose};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct BackoffClient {
    repo: Arc<dyn BackoffRepository>,
    threshold: i64,
}

impl BackoffClient {
    pub fn new(repo: Arc<dyn BackoffRepository>, threshold: i64) -> Self {
        Self { repo, threshold }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Read the record and compare against the threshold. A missing
    /// record means the item has never failed. Read errors propagate;
    /// the collector fails open on them.
    pub async fn should_skip(
        &self,
        kind: BackoffKind,
        id: i64,
        purpose: SearchPurpose,
    ) -> Result<bool> {
        let count = self.repo.failure_count(kind, id, purpose).await?;
        Ok(count.is_some_and(|count| count >= self.threshold))
    }

    /// Increment the failure counter for an item. Bookkeeping failures
    /// are logged and swallowed; they never fail the surrounding run.
    pub async fn record_failure(&self, media_type: MediaType, id: i64, purpose: SearchPurpose) {
        let kind = media_type.backoff_kind();
        if let Err(error) = self.repo.increment_failure(kind, id, purpose).await {
            warn!(%kind, id, %purpose, %error, "Failed to increment search backoff");
        }
    }

    /// Reset the failure counter after a successful grab.
    pub async fn record_success(&self, media_type: MediaType, id: i64, purpose: SearchPurpose) {
        let kind = media_type.backoff_kind();
        if let Err(error) = self.repo.reset_failure(kind, id, purpose).await {
            warn!(%kind, id, %purpose, %error, "Failed to reset search backoff");
        }
    }

    /// Clear every record for an item, both purposes. Used by the manual
    /// retry verbs. An episode reset also clears series-level backoff so
    /// future season-pack searches are unblocked.
    pub async fn clear_for_retry(
        &self,
        kind: BackoffKind,
        id: i64,
        series_id: Option<i64>,
    ) -> Result<()> {
        for purpose in [SearchPurpose::Missing, SearchPurpose::Upgrade] {
            self.repo.reset_failure(kind, id, purpose).await?;
        }
        if kind == BackoffKind::Episode {
            if let Some(series_id) = series_id {
                for purpose in [SearchPurpose::Missing, SearchPurpose::Upgrade] {
                    self.repo
                        .reset_failure(BackoffKind::Series, series_id, purpose)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetcharrError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryBackoff {
        counts: Mutex<HashMap<(BackoffKind, i64, SearchPurpose), i64>>,
        fail_reads: bool,
    }

    #[async_trait]
    impl BackoffRepository for InMemoryBackoff {
        async fn failure_count(
            &self,
            kind: BackoffKind,
            id: i64,
            purpose: SearchPurpose,
        ) -> Result<Option<i64>> {
            if self.fail_reads {
                return Err(FetcharrError::DatabaseError {
                    message: "backoff store unavailable".to_string(),
                });
            }
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

    #[tokio::test]
    async fn missing_record_is_not_skipped() {
        let client = BackoffClient::new(Arc::new(InMemoryBackoff::default()), 3);
        let skip = client
            .should_skip(BackoffKind::Movie, 7, SearchPurpose::Missing)
            .await
            .unwrap();
        assert!(!skip);
    }

    #[tokio::test]
    async fn skip_kicks_in_at_threshold() {
        let repo = Arc::new(InMemoryBackoff::default());
        let client = BackoffClient::new(repo.clone(), 3);

        for _ in 0..2 {
            client
                .record_failure(MediaType::Movie, 7, SearchPurpose::Missing)
                .await;
        }
        assert!(!client
            .should_skip(BackoffKind::Movie, 7, SearchPurpose::Missing)
            .await
            .unwrap());

        client
            .record_failure(MediaType::Movie, 7, SearchPurpose::Missing)
            .await;
        assert!(client
            .should_skip(BackoffKind::Movie, 7, SearchPurpose::Missing)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn success_resets_the_counter() {
        let client = BackoffClient::new(Arc::new(InMemoryBackoff::default()), 2);
        for _ in 0..5 {
            client
                .record_failure(MediaType::Movie, 7, SearchPurpose::Missing)
                .await;
        }
        client
            .record_success(MediaType::Movie, 7, SearchPurpose::Missing)
            .await;
        assert!(!client
            .should_skip(BackoffKind::Movie, 7, SearchPurpose::Missing)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn season_failures_are_recorded_against_the_series() {
        let repo = Arc::new(InMemoryBackoff::default());
        let client = BackoffClient::new(repo.clone(), 1);
        client
            .record_failure(MediaType::Season, 42, SearchPurpose::Missing)
            .await;
        assert!(client
            .should_skip(BackoffKind::Series, 42, SearchPurpose::Missing)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn episode_retry_also_clears_series_level_backoff() {
        let repo = Arc::new(InMemoryBackoff::default());
        let client = BackoffClient::new(repo.clone(), 1);
        client
            .record_failure(MediaType::Episode, 100, SearchPurpose::Missing)
            .await;
        client
            .record_failure(MediaType::Season, 42, SearchPurpose::Missing)
            .await;

        client
            .clear_for_retry(BackoffKind::Episode, 100, Some(42))
            .await
            .unwrap();

        assert!(!client
            .should_skip(BackoffKind::Episode, 100, SearchPurpose::Missing)
            .await
            .unwrap());
        assert!(!client
            .should_skip(BackoffKind::Series, 42, SearchPurpose::Missing)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn read_errors_propagate_to_the_caller() {
        let repo = Arc::new(InMemoryBackoff {
            fail_reads: true,
            ..Default::default()
        });
        let client = BackoffClient::new(repo, 3);
        let result = client
            .should_skip(BackoffKind::Movie, 7, SearchPurpose::Missing)
            .await;
        assert!(result.is_err());
    }
}
