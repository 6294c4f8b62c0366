//! Process-wide keyed grab lock
//!
//! Non-blocking mutual exclusion between subsystems that may hand the
//! same item to a download client (auto-search, RSS sync, manual
//! grabs). Holders key on `"{media_type}:{media_id}"`. The lock is
//! passed by reference to whoever needs it, never resolved globally.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct KeyedLock {
    held: Mutex<HashSet<String>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `key` if nobody holds it. Never blocks.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string())
    }

    pub fn release(&self, key: &str) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}
