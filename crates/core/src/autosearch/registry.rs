//! In-flight search tracking with preemptive cancellation
//!
//! At most one search runs per `(media_type, media_id)`. Re-entering
//! for the same item cancels and replaces the prior search; duplicates
//! are never queued.

use crate::models::MediaType;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// Key under which an item registers: `"{media_type}:{media_id}"`.
pub fn search_key(media_type: MediaType, media_id: i64) -> String {
    format!("{}:{}", media_type, media_id)
}

/// Handle returned by [`ActiveSearchRegistry::register`]. Carries the
/// cancellation token the search pipeline must honor, and the generation
/// that makes unregistration safe against preemption races.
#[derive(Debug, Clone)]
pub struct SearchHandle {
    pub key: String,
    pub token: CancellationToken,
    generation: u64,
}

#[derive(Debug)]
pub struct ActiveSearchRegistry {
    /// Detached background scope the per-search tokens derive from. The
    /// caller's scope is deliberately not used: a trigger going away must
    /// not kill the search it launched.
    root: CancellationToken,
    generation: AtomicU64,
    entries: RwLock<HashMap<String, (u64, CancellationToken)>>,
}

impl ActiveSearchRegistry {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            generation: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register `key`, preempting any search already registered under it.
    pub fn register(&self, key: &str) -> SearchHandle {
        let token = self.root.child_token();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((_, prior)) = entries.insert(key.to_string(), (generation, token.clone())) {
            prior.cancel();
        }
        SearchHandle {
            key: key.to_string(),
            token,
            generation,
        }
    }

    /// Remove the entry for `handle` unless a newer registration has
    /// already replaced it.
    pub fn unregister(&self, handle: &SearchHandle) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(&handle.key)
            .is_some_and(|(generation, _)| *generation == handle.generation)
        {
            entries.remove(&handle.key);
        }
    }

    /// Cancel and remove the search for an item. Returns whether one was
    /// registered.
    pub fn cancel(&self, media_type: MediaType, media_id: i64) -> bool {
        let key = search_key(media_type, media_id);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.remove(&key) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_searching(&self, media_type: MediaType, media_id: i64) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&search_key(media_type, media_id))
    }
}

impl Default for ActiveSearchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
