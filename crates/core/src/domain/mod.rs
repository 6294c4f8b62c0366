//! Domain contracts
//!
//! Traits describing the external collaborators the auto-search engine
//! is wired against: persistence, the indexer layer, the download
//! client, and the quality service.

pub mod repositories;
pub mod services;

pub use repositories::*;
pub use services::*;
