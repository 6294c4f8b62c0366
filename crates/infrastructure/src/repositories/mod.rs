//! PostgreSQL repository implementations

pub mod backoff;
pub mod history;
pub mod library;
pub mod quality;
pub mod settings;

pub use backoff::PostgresBackoffRepository;
pub use history::PostgresHistoryRepository;
pub use library::PostgresLibraryStore;
pub use quality::PostgresQualityService;
pub use settings::PostgresSettingsRepository;
