//! Interval scheduler for auto-search runs
//!
//! The engine owns no timers; this task is the external scheduler that
//! invokes it. One full run every `interval_hours`, skipped while a
//! previous run is still active (the runner is single-flight anyway).

use fetcharr_core::{AutoSearchConfig, RunOutcome, SearchRunner};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub fn spawn(
    runner: Arc<SearchRunner>,
    config: AutoSearchConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            info!("Auto-search scheduling disabled");
            return;
        }

        let period = Duration::from_secs(u64::from(config.interval_hours) * 3600);
        info!(interval_hours = config.interval_hours, "Auto-search scheduler started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the interval fires immediately; wait one full period instead
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match runner.run_all(shutdown.child_token()).await {
                        Ok(RunOutcome::AlreadyRunning) => {
                            info!("Scheduled run skipped, a run is already active")
                        }
                        Ok(RunOutcome::Finished(batch)) => info!(
                            total_searched = batch.total_searched,
                            found = batch.found,
                            downloaded = batch.downloaded,
                            failed = batch.failed,
                            "Scheduled run finished"
                        ),
                        Err(err) => error!(error = %err, "Scheduled run failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Auto-search scheduler stopping");
                    break;
                }
            }
        }
    })
}
