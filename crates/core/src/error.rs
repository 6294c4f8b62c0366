//! Core error types for the Fetcharr domain

use thiserror::Error;

#[cfg(feature = "postgres")]
use sqlx;

#[derive(Error, Debug)]
pub enum FetcharrError {
    #[error("Movie not found: {id}")]
    MovieNotFound { id: i64 },

    #[error("Episode not found: {id}")]
    EpisodeNotFound { id: i64 },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid quality profile: {profile}")]
    InvalidQualityProfile { profile: String },

    #[error("Indexer error: {message}")]
    IndexerError { message: String },

    #[error("Grab error: {message}")]
    GrabError { message: String },

    #[error("Domain validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    #[error("External service error: {service} - {error}")]
    ExternalServiceError { service: String, error: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Configuration error: {field} - {message}")]
    ConfigurationError { field: String, message: String },

    #[error("Search cancelled: {key}")]
    Cancelled { key: String },
}

impl FetcharrError {
    /// Whether this error is the cancellation sentinel rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetcharrError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, FetcharrError>;

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for FetcharrError {
    fn from(err: sqlx::Error) -> Self {
        FetcharrError::DatabaseError {
            message: err.to_string(),
        }
    }
}
