//! External service contracts consumed by the auto-search engine

use crate::error::Result;
use crate::models::*;
use async_trait::async_trait;

/// Indexer query layer. Returns candidate releases pre-sorted by score
/// descending, along with the response headers so the rate limiter can
/// honor server-declared `Retry-After` hints.
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn search_torrents(
        &self,
        criteria: &SearchCriteria,
        scoring: &ScoringParams,
    ) -> Result<IndexerResponse>;
}

/// Download-client grab layer. Transport failures are `Err`; a client
/// that reaches the other side but declines reports `success = false`.
#[async_trait]
pub trait GrabClient: Send + Sync {
    async fn grab(&self, request: &GrabRequest) -> Result<GrabReceipt>;
}

/// Quality profile resolution. The engine treats profiles as black-box
/// predicates; callers fall back to [`QualityProfile::fallback`] when
/// resolution fails.
#[async_trait]
pub trait QualityService: Send + Sync {
    async fn get_profile(&self, id: i64) -> Result<QualityProfile>;
}

/// Season-pack eligibility oracles.
#[async_trait]
pub trait SeasonPackEligibility: Send + Sync {
    /// True iff the season is monitored, has more than one episode, and
    /// every episode is monitored, released, and without a file.
    async fn is_season_pack_eligible(&self, series_id: i64, season_number: i32) -> Result<bool>;

    /// True iff the season is monitored, has more than one episode, and
    /// every monitored episode is upgradable.
    async fn is_season_pack_upgrade_eligible(
        &self,
        series_id: i64,
        season_number: i32,
    ) -> Result<bool>;
}
