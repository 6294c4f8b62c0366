//! Domain models for the auto-search engine

pub mod item;
pub mod library;
pub mod outcome;
pub mod quality;
pub mod release;
pub mod search;

pub use item::{BackoffKind, MediaStatus, MediaType, SearchPurpose, SearchableItem, WorkItem};
pub use library::{EpisodeRow, MovieRow, Season};
pub use outcome::{BatchSearchResult, SearchResult};
pub use quality::QualityProfile;
pub use release::{Release, ReleaseProtocol};
pub use search::{
    GrabReceipt, GrabRequest, IndexerResponse, ScoringParams, SearchCriteria, SearchType,
};
