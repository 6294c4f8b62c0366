//! Auto-search event broadcasting
//!
//! A small event bus over tokio broadcast channels. Search progress is
//! published fire-and-forget; components that care (websocket layer,
//! notification senders) subscribe, and publishing without subscribers
//! is not an error.

use crate::models::MediaType;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Maximum number of events buffered per subscriber.
const EVENT_BUFFER_SIZE: usize = 1000;

/// Events emitted by the auto-search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AutoSearchEvent {
    /// A per-item search started.
    #[serde(rename = "autosearch:started")]
    SearchStarted {
        media_type: MediaType,
        media_id: i64,
        title: String,
        source: String,
    },
    /// A per-item search reached a terminal state without failing.
    #[serde(rename = "autosearch:completed")]
    SearchCompleted {
        media_type: MediaType,
        media_id: i64,
        title: String,
        found: bool,
        downloaded: bool,
        upgraded: bool,
        release_name: Option<String>,
        client_name: Option<String>,
    },
    /// A per-item search failed against a dependency.
    #[serde(rename = "autosearch:failed")]
    SearchFailed {
        media_type: MediaType,
        media_id: i64,
        title: String,
        error: String,
    },
    /// A scheduled run started.
    #[serde(rename = "autosearch:task:started")]
    TaskStarted { total_items: usize },
    /// A scheduled run moved on to the next item.
    #[serde(rename = "autosearch:task:progress")]
    TaskProgress {
        current_item: usize,
        total_items: usize,
        current_title: String,
    },
    /// A scheduled run finished (possibly after cancellation, with
    /// partial counts).
    #[serde(rename = "autosearch:task:completed")]
    TaskCompleted {
        total_searched: usize,
        found: usize,
        downloaded: usize,
        failed: usize,
        elapsed_ms: u64,
    },
}

impl AutoSearchEvent {
    /// Short description for logging.
    pub fn description(&self) -> String {
        match self {
            AutoSearchEvent::SearchStarted { title, .. } => format!("search started: {}", title),
            AutoSearchEvent::SearchCompleted {
                title,
                found,
                downloaded,
                ..
            } => format!(
                "search completed: {} (found={}, downloaded={})",
                title, found, downloaded
            ),
            AutoSearchEvent::SearchFailed { title, error, .. } => {
                format!("search failed: {} ({})", title, error)
            }
            AutoSearchEvent::TaskStarted { total_items } => {
                format!("task started: {} items", total_items)
            }
            AutoSearchEvent::TaskProgress {
                current_item,
                total_items,
                current_title,
            } => format!(
                "task progress: {}/{} {}",
                current_item, total_items, current_title
            ),
            AutoSearchEvent::TaskCompleted {
                total_searched,
                downloaded,
                failed,
                ..
            } => format!(
                "task completed: {} searched, {} downloaded, {} failed",
                total_searched, downloaded, failed
            ),
        }
    }
}

/// Fire-and-forget event sink. The engine holds an `Option<Arc<dyn
/// Broadcaster>>`; running without one is valid.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: AutoSearchEvent);
}

/// Event bus for publishing and subscribing to auto-search events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AutoSearchEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<AutoSearchEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for EventBus {
    fn broadcast(&self, event: AutoSearchEvent) {
        debug!("Publishing event: {}", event.description());
        // No receivers is fine; nobody is listening right now.
        let _ = self.sender.send(event);
    }
}
