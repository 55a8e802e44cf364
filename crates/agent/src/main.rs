//! Housekeeper agent - periodic file lifecycle daemon
//!
//! Runs the job scheduler until interrupted and serves health and metrics
//! endpoints alongside it.

use anyhow::{Context, Result};
use housekeeper_lib::{
    health::HealthRegistry,
    observability::{init_tracing, HousekeeperMetrics, StructuredLogger},
    Housekeeper, Scheduler, ShutdownSignals,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;
    let _log_guard = init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("Starting housekeeper-agent");

    config
        .prepare_directories()
        .context("Failed to prepare working directories")?;

    let health_registry = HealthRegistry::new();

    let metrics = HousekeeperMetrics::new();
    let logger = StructuredLogger::for_local_host();

    let housekeeper = Arc::new(
        Housekeeper::new(config.clone()).with_observability(metrics.clone(), logger.clone()),
    );

    let scheduler = Scheduler::builder()
        .executor(housekeeper)
        .poll_interval(config.poll_interval())
        .jobs(config.build_jobs()?)
        .health(health_registry.clone())
        .metrics(metrics)
        .logger(logger.clone())
        .build()
        .context("Failed to build job schedule")?;

    for job in scheduler.jobs() {
        info!(
            job = %job.name,
            action = %job.action,
            trigger = %job.trigger,
            next_due = %job.next_due,
            "Job registered"
        );
    }
    logger.log_startup(AGENT_VERSION, scheduler.len());

    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(health_registry.clone()));
    let api_port = config.api_port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, port = api_port, "API server stopped");
        }
    });

    let mut signals = ShutdownSignals::install().context("Failed to install signal handlers")?;
    health_registry.set_ready(true);

    let signal = signals
        .recv()
        .await
        .context("Failed to wait for shutdown signal")?;
    logger.log_shutdown(&format!("{} received", signal));
    health_registry.set_ready(false);

    // Lets an in-flight job finish before exiting
    let _ = shutdown_tx.send(());
    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "Scheduler task ended abnormally");
    }
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
