//! The auto-search engine
//!
//! Given a library of monitored movies and series, the engine
//! periodically enumerates wanted items, searches indexers for suitable
//! releases, selects the best candidate per quality profile, and hands
//! the selection to a download client. Runs are sequential, cancellable,
//! paced by an adaptive rate limiter, and gated per item by a persistent
//! failure backoff.

pub mod backoff;
pub mod collector;
pub mod criteria;
pub mod executor;
pub mod rate_limit;
pub mod registry;
pub mod runner;
pub mod selector;

pub use backoff::BackoffClient;
pub use collector::ItemCollector;
pub use criteria::build_search_criteria;
pub use executor::SearchExecutor;
pub use rate_limit::AdaptiveRateLimiter;
pub use registry::{search_key, ActiveSearchRegistry, SearchHandle};
pub use runner::{RunOutcome, RunScope, SearchRunner};
pub use selector::select_best_release;

use crate::error::{FetcharrError, Result};
use serde::{Deserialize, Serialize};

/// Runtime settings for the auto-search engine. Persisted as one JSON
/// settings record; the scheduler in the binary consumes `enabled` and
/// `interval_hours`, the engine consumes the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSearchConfig {
    /// Master switch for scheduled runs.
    pub enabled: bool,
    /// Scheduling cadence, 1-24 hours.
    pub interval_hours: u32,
    /// Failure count at which an item is skipped.
    pub backoff_threshold: i64,
    /// Rate-limiter base delay between items.
    pub base_delay_ms: u64,
}

impl Default for AutoSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 12,
            backoff_threshold: 5,
            base_delay_ms: 2_000,
        }
    }
}

impl AutoSearchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=24).contains(&self.interval_hours) {
            return Err(FetcharrError::ValidationError {
                field: "interval_hours".to_string(),
                message: "must be between 1 and 24".to_string(),
            });
        }
        if self.backoff_threshold < 1 {
            return Err(FetcharrError::ValidationError {
                field: "backoff_threshold".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
