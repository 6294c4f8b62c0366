//! Quality profile domain model

use serde::{Deserialize, Serialize};

/// Named policy encapsulating acceptance and upgrade predicates over
/// quality ids. Quality ids are ordered: a larger id is a better quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i64,
    pub name: String,

    /// Acceptable quality ids; empty means any quality is acceptable.
    pub allowed_quality_ids: Vec<i32>,
    /// Upgrades stop once a file at or above the cutoff exists.
    pub cutoff_quality_id: i32,
    pub upgrade_allowed: bool,
}

impl QualityProfile {
    pub fn is_acceptable(&self, quality_id: i32) -> bool {
        self.allowed_quality_ids.is_empty() || self.allowed_quality_ids.contains(&quality_id)
    }

    /// Whether replacing `current` with `candidate` is a strict improvement
    /// this profile wants.
    pub fn is_upgrade(&self, current: i32, candidate: i32) -> bool {
        self.upgrade_allowed && current < self.cutoff_quality_id && candidate > current
    }

    /// Substitute used when a configured profile cannot be resolved.
    /// Accepts everything so searches keep making progress.
    pub fn fallback() -> Self {
        Self {
            id: 0,
            name: "fallback".to_string(),
            allowed_quality_ids: Vec::new(),
            cutoff_quality_id: i32::MAX,
            upgrade_allowed: true,
        }
    }
}
