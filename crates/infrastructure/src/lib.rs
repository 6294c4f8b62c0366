//! Infrastructure layer for Fetcharr
//!
//! PostgreSQL-backed implementations of the core repository and service
//! contracts, plus connection pool management and migrations.

pub mod database;
pub mod repositories;

pub use database::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::{
    PostgresBackoffRepository, PostgresHistoryRepository, PostgresLibraryStore,
    PostgresQualityService, PostgresSettingsRepository,
};
