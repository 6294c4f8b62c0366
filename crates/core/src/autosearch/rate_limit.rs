//! Adaptive pacing between successive indexer requests
//!
//! One limiter per process, shared across all runs. A server-declared
//! `Retry-After` always wins over the adaptive formula until its
//! deadline passes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct RateLimitState {
    last_response: Duration,
    retry_not_before: Option<Instant>,
}

#[derive(Debug)]
pub struct AdaptiveRateLimiter {
    base_delay: Duration,
    state: Mutex<RateLimitState>,
}

impl AdaptiveRateLimiter {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            state: Mutex::new(RateLimitState {
                last_response: Duration::ZERO,
                retry_not_before: None,
            }),
        }
    }

    /// How long to wait before the next request. Zero means no wait.
    pub fn delay(&self) -> Duration {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if let Some(deadline) = state.retry_not_before {
            if deadline > now {
                return deadline - now;
            }
        }
        self.base_delay + state.last_response / 2
    }

    /// Record an observed request. `headers` may carry a `Retry-After`
    /// value in integer seconds; malformed values are ignored.
    pub fn record(&self, response_duration: Duration, headers: Option<&HashMap<String, String>>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_response = response_duration;

        let retry_after = headers.and_then(|headers| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
                .map(|(_, value)| value.clone())
        });
        if let Some(value) = retry_after {
            match value.trim().parse::<u64>() {
                Ok(seconds) => {
                    debug!(seconds, "Honoring Retry-After hint");
                    state.retry_not_before = Some(Instant::now() + Duration::from_secs(seconds));
                }
                Err(_) => debug!(value = %value, "Ignoring malformed Retry-After header"),
            }
        }
    }
}
