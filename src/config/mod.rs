//! Application configuration
//!
//! Complete configuration for the Fetcharr binary: server, database,
//! indexer aggregation, download client, and the auto-search engine.
//! Everything comes from the environment (optionally via `.env`); the
//! persisted auto-search settings override the environment defaults at
//! startup.

use fetcharr_core::{AutoSearchConfig, Result};
use fetcharr_downloaders::QBittorrentConfig;
use fetcharr_indexers::ProwlarrConfig;
use fetcharr_infrastructure::DatabaseConfig;
use std::env;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7337,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub prowlarr: ProwlarrConfig,
    pub qbittorrent: QBittorrentConfig,
    pub autosearch: AutoSearchConfig,
}

impl AppConfig {
    /// Load configuration from environment variables and validate it.
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("FETCHARR_HOST").unwrap_or_else(|_| ServerConfig::default().host),
            port: env_parsed("FETCHARR_PORT", ServerConfig::default().port),
        };

        let prowlarr_defaults = ProwlarrConfig::default();
        let prowlarr = ProwlarrConfig {
            base_url: env::var("PROWLARR_BASE_URL").unwrap_or(prowlarr_defaults.base_url),
            api_key: env::var("PROWLARR_API_KEY").unwrap_or(prowlarr_defaults.api_key),
            timeout: env_parsed("PROWLARR_TIMEOUT_SECS", prowlarr_defaults.timeout),
            user_agent: prowlarr_defaults.user_agent,
        };

        let qbit_defaults = QBittorrentConfig::default();
        let qbittorrent = QBittorrentConfig {
            base_url: env::var("QBITTORRENT_BASE_URL").unwrap_or(qbit_defaults.base_url),
            username: env::var("QBITTORRENT_USERNAME").unwrap_or(qbit_defaults.username),
            password: env::var("QBITTORRENT_PASSWORD").unwrap_or(qbit_defaults.password),
            timeout: env_parsed("QBITTORRENT_TIMEOUT_SECS", qbit_defaults.timeout),
        };

        let autosearch_defaults = AutoSearchConfig::default();
        let autosearch = AutoSearchConfig {
            enabled: env_parsed("AUTOSEARCH_ENABLED", autosearch_defaults.enabled),
            interval_hours: env_parsed(
                "AUTOSEARCH_INTERVAL_HOURS",
                autosearch_defaults.interval_hours,
            ),
            backoff_threshold: env_parsed(
                "AUTOSEARCH_BACKOFF_THRESHOLD",
                autosearch_defaults.backoff_threshold,
            ),
            base_delay_ms: env_parsed("AUTOSEARCH_BASE_DELAY_MS", autosearch_defaults.base_delay_ms),
        };
        autosearch.validate()?;

        Ok(Self {
            server,
            database: DatabaseConfig::from_env(),
            prowlarr,
            qbittorrent,
            autosearch,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
