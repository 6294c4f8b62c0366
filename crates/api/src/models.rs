//! API request and response models

use fetcharr_core::MediaStatus;
use serde::{Deserialize, Serialize};

/// Response to a run trigger. Triggers never queue: when a run is
/// already active the request is acknowledged without starting another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub started: bool,
    pub message: String,
}

/// Response to a manual retry of a failed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryResponse {
    pub id: i64,
    pub status: MediaStatus,
}
