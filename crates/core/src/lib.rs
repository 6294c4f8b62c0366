//! Core domain models and the auto-search engine for Fetcharr
//!
//! This crate contains the domain models, collaborator contracts, and
//! the auto-search engine that drives search, selection, and grabbing
//! of releases for monitored movies and series.

pub mod autosearch;
pub mod domain;
pub mod error;
pub mod events;
pub mod grab_lock;
pub mod models;

// Re-export core types
pub use autosearch::{
    build_search_criteria, search_key, select_best_release, ActiveSearchRegistry,
    AdaptiveRateLimiter, AutoSearchConfig, BackoffClient, ItemCollector, RunOutcome, RunScope,
    SearchExecutor, SearchHandle, SearchRunner,
};
pub use domain::*;
pub use error::*;
pub use events::*;
pub use grab_lock::KeyedLock;
pub use models::*;
