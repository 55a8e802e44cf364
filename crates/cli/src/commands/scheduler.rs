//! Scheduler commands: foreground loop, one-shot run and job listing

use anyhow::{bail, Context, Result};
use colored::Colorize;
use housekeeper_lib::observability::init_tracing;
use housekeeper_lib::scheduler::JobRun;
use housekeeper_lib::{
    Housekeeper, HousekeeperConfig, HousekeeperMetrics, JobStatus, Scheduler, ShutdownSignals,
    StructuredLogger,
};
use std::sync::Arc;
use tabled::Tabled;
use tokio::sync::broadcast;

use crate::output::{
    color_status, format_timestamp, print_header, print_info, print_json, print_rows,
    print_success, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "Job")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Trigger")]
    trigger: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Next Due")]
    next_due: String,
}

impl From<&JobStatus> for JobRow {
    fn from(job: &JobStatus) -> Self {
        Self {
            name: job.name.clone(),
            action: job.action.clone(),
            trigger: job.trigger.clone(),
            state: color_status(&job.state.to_string()),
            next_due: format_timestamp(&job.next_due),
        }
    }
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Warnings")]
    warnings: usize,
    #[tabled(rename = "Elapsed")]
    elapsed: String,
}

impl From<&JobRun> for RunRow {
    fn from(run: &JobRun) -> Self {
        let result = match (run.success, run.warnings.is_empty()) {
            (false, _) => "failed",
            (true, false) => "warning",
            (true, true) => "ok",
        };
        Self {
            job: run.job.clone(),
            result: color_status(result),
            summary: run.summary.clone(),
            warnings: run.warnings.len(),
            elapsed: format!("{}ms", run.elapsed_ms),
        }
    }
}

fn build_scheduler(
    config: &HousekeeperConfig,
    housekeeper: Arc<Housekeeper>,
    logger: StructuredLogger,
) -> Result<Scheduler> {
    Scheduler::builder()
        .executor(housekeeper)
        .poll_interval(config.poll_interval())
        .jobs(config.build_jobs()?)
        .logger(logger)
        .build()
        .context("Failed to build job schedule")
}

/// Run the scheduler until SIGINT or SIGTERM
pub async fn run(config: HousekeeperConfig) -> Result<()> {
    let _log_guard = init_tracing(&config.logging).context("Failed to initialize logging")?;
    let mut signals = ShutdownSignals::install().context("Failed to install signal handlers")?;
    config
        .prepare_directories()
        .context("Failed to prepare working directories")?;

    let logger = StructuredLogger::for_local_host();
    let housekeeper = Arc::new(
        Housekeeper::new(config.clone())
            .with_observability(HousekeeperMetrics::new(), logger.clone()),
    );
    let scheduler = build_scheduler(&config, housekeeper, logger.clone())?;
    logger.log_startup(env!("CARGO_PKG_VERSION"), scheduler.len());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(scheduler.run(shutdown_rx));

    let signal = signals
        .recv()
        .await
        .context("Failed to wait for shutdown signal")?;
    logger.log_shutdown(&format!("{} received", signal));

    let _ = shutdown_tx.send(());
    handle.await.context("Scheduler task ended abnormally")?;
    Ok(())
}

/// Run every job once and report the outcomes
pub fn run_once(config: HousekeeperConfig, format: OutputFormat) -> Result<()> {
    config
        .prepare_directories()
        .context("Failed to prepare working directories")?;

    let logger = StructuredLogger::for_local_host();
    let housekeeper = Arc::new(Housekeeper::new(config.clone()));
    let mut scheduler = build_scheduler(&config, housekeeper, logger)?;

    let summary = scheduler.run_all();

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_header("Run Once");
            print_rows(
                summary.runs.iter().map(RunRow::from).collect(),
                "No jobs configured",
            );
            for run in &summary.runs {
                for warning in &run.warnings {
                    print_warning(&format!("{}: {}", run.job, warning));
                }
            }
        }
    }

    if summary.failed() > 0 {
        bail!("{} of {} jobs failed", summary.failed(), summary.runs.len());
    }
    if matches!(format, OutputFormat::Table) {
        print_success(&format!("{} jobs completed", summary.succeeded()));
    }
    Ok(())
}

/// List configured jobs and their next due instants
pub fn list_jobs(config: HousekeeperConfig, format: OutputFormat) -> Result<()> {
    let logger = StructuredLogger::for_local_host();
    let housekeeper = Arc::new(Housekeeper::new(config.clone()));
    let scheduler = build_scheduler(&config, housekeeper, logger)?;
    let jobs = scheduler.jobs();

    match format {
        OutputFormat::Json => print_json(&jobs)?,
        OutputFormat::Table => {
            print_header("Scheduled Jobs");
            print_rows(jobs.iter().map(JobRow::from).collect(), "No jobs configured");
            println!(
                "\nPolling every {}s",
                config.poll_interval_secs.to_string().cyan()
            );
            print_info("Times are UTC");
        }
    }
    Ok(())
}
