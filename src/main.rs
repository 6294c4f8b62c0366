//! Fetcharr - unified application entry point
//!
//! Wires the auto-search engine to its collaborators (PostgreSQL,
//! Prowlarr, qBittorrent), starts the HTTP trigger surface, and runs
//! the interval scheduler.

use clap::Parser;
use fetcharr_api::{create_router, ApiState};
use fetcharr_core::{
    ActiveSearchRegistry, AdaptiveRateLimiter, BackoffClient, Broadcaster, EventBus,
    FetcharrError, ItemCollector, KeyedLock, LibraryStore, Result, SearchExecutor, SearchRunner,
    SeasonPackEligibility,
};
use fetcharr_downloaders::QBittorrentClient;
use fetcharr_indexers::ProwlarrClient;
use fetcharr_infrastructure::{
    create_pool, run_migrations, PostgresBackoffRepository, PostgresHistoryRepository,
    PostgresLibraryStore, PostgresQualityService, PostgresSettingsRepository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod scheduler;

use config::AppConfig;
use fetcharr_core::SettingsRepository;

#[derive(Debug, Parser)]
#[command(name = "fetcharr", about = "Autonomous movie and TV release acquisition")]
struct Args {
    /// Override the HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fetcharr");

    let mut app_config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        app_config.server.port = port;
    }

    let pool = create_pool(&app_config.database).await?;
    run_migrations(&pool).await?;

    // Persisted settings win over environment defaults.
    let settings: Arc<dyn SettingsRepository> =
        Arc::new(PostgresSettingsRepository::new(pool.clone()));
    let autosearch = match settings.load_autosearch().await {
        Ok(Some(stored)) => stored,
        Ok(None) => app_config.autosearch.clone(),
        Err(error) => {
            warn!(%error, "Failed to load persisted settings, using environment defaults");
            app_config.autosearch.clone()
        }
    };
    info!(
        enabled = autosearch.enabled,
        interval_hours = autosearch.interval_hours,
        backoff_threshold = autosearch.backoff_threshold,
        "Auto-search configuration loaded"
    );

    // Collaborators
    let library = Arc::new(PostgresLibraryStore::new(pool.clone()));
    let library_store: Arc<dyn LibraryStore> = library.clone();
    let eligibility: Arc<dyn SeasonPackEligibility> = library.clone();
    let backoff = BackoffClient::new(
        Arc::new(PostgresBackoffRepository::new(pool.clone())),
        autosearch.backoff_threshold,
    );
    let history = Arc::new(PostgresHistoryRepository::new(pool.clone()));
    let quality = Arc::new(PostgresQualityService::new(pool.clone()));
    let indexer = Arc::new(ProwlarrClient::new(app_config.prowlarr.clone())?);
    let grab_client = Arc::new(QBittorrentClient::new(app_config.qbittorrent.clone())?);
    let event_bus = Arc::new(EventBus::new());

    // Engine
    let registry = Arc::new(ActiveSearchRegistry::new());
    let grab_lock = Arc::new(KeyedLock::new());
    let rate_limiter = Arc::new(AdaptiveRateLimiter::new(Duration::from_millis(
        autosearch.base_delay_ms,
    )));
    let executor = Arc::new(SearchExecutor::new(
        registry,
        indexer,
        quality,
        grab_client,
        grab_lock,
        rate_limiter.clone(),
        library_store.clone(),
        history.clone(),
        Some(event_bus.clone() as Arc<dyn Broadcaster>),
    ));
    let collector = ItemCollector::new(library_store.clone(), eligibility, backoff.clone());
    let runner = Arc::new(SearchRunner::new(
        collector,
        executor,
        rate_limiter,
        backoff.clone(),
        Some(event_bus.clone() as Arc<dyn Broadcaster>),
    ));

    // Scheduler owns the run cadence; shutting down cancels in-flight runs.
    let shutdown = CancellationToken::new();
    let scheduler_handle = scheduler::spawn(runner.clone(), autosearch, shutdown.child_token());

    // HTTP surface
    let state = ApiState {
        runner,
        backoff,
        library: library_store,
        history,
        settings,
    };
    let app = create_router(state);

    let addr = SocketAddr::new(
        app_config.server.host.parse().map_err(|e| {
            FetcharrError::ConfigurationError {
                field: "host".to_string(),
                message: format!("{}", e),
            }
        })?,
        app_config.server.port,
    );
    info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        FetcharrError::ExternalServiceError {
            service: "http_server".to_string(),
            error: format!("Failed to bind to address: {}", e),
        }
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FetcharrError::ExternalServiceError {
            service: "http_server".to_string(),
            error: format!("Server error: {}", e),
        })?;

    info!("Fetcharr shutting down");
    shutdown.cancel();
    let _ = scheduler_handle.await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            signal.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
