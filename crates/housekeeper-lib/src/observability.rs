//! Observability infrastructure for the housekeeper
//!
//! Provides:
//! - Prometheus metrics (job runs, job duration, deletions, backups, last snapshot)
//! - Structured event logging with tracing
//! - Subscriber setup with an append-only log file

use crate::config::LoggingConfig;
use crate::error::{HousekeeperError, IoResultExt, Result};
use crate::models::ResourceSnapshot;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Histogram buckets for job durations (in seconds)
const JOB_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MetricsInner> = OnceLock::new();

struct MetricsInner {
    job_runs: IntCounterVec,
    job_duration_seconds: HistogramVec,
    jobs_registered: IntGauge,
    files_deleted: IntCounter,
    deletion_failures: IntCounter,
    backups_created: IntCounter,
    last_backup_bytes: IntGauge,
    cpu_percent: Gauge,
    memory_percent: Gauge,
    disk_percent: Gauge,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            job_runs: register_int_counter_vec!(
                "housekeeper_job_runs_total",
                "Job executions by job name and outcome",
                &["job", "outcome"]
            )
            .expect("Failed to register job_runs_total"),

            job_duration_seconds: register_histogram_vec!(
                "housekeeper_job_duration_seconds",
                "Wall time spent executing a job action",
                &["job"],
                JOB_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register job_duration_seconds"),

            jobs_registered: register_int_gauge!(
                "housekeeper_jobs_registered",
                "Number of jobs in the scheduler table"
            )
            .expect("Failed to register jobs_registered"),

            files_deleted: register_int_counter!(
                "housekeeper_files_deleted_total",
                "Files and backups removed by retention jobs"
            )
            .expect("Failed to register files_deleted_total"),

            deletion_failures: register_int_counter!(
                "housekeeper_deletion_failures_total",
                "Deletions that failed and were skipped"
            )
            .expect("Failed to register deletion_failures_total"),

            backups_created: register_int_counter!(
                "housekeeper_backups_created_total",
                "Backups completed successfully"
            )
            .expect("Failed to register backups_created_total"),

            last_backup_bytes: register_int_gauge!(
                "housekeeper_last_backup_bytes",
                "Size of the most recent backup in bytes"
            )
            .expect("Failed to register last_backup_bytes"),

            cpu_percent: register_gauge!(
                "housekeeper_host_cpu_percent",
                "CPU usage from the latest resource snapshot"
            )
            .expect("Failed to register host_cpu_percent"),

            memory_percent: register_gauge!(
                "housekeeper_host_memory_percent",
                "Memory usage from the latest resource snapshot"
            )
            .expect("Failed to register host_memory_percent"),

            disk_percent: register_gauge!(
                "housekeeper_host_disk_percent",
                "Disk usage from the latest resource snapshot"
            )
            .expect("Failed to register host_disk_percent"),
        }
    }
}

/// Housekeeper metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct HousekeeperMetrics {
    _private: (),
}

impl Default for HousekeeperMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HousekeeperMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MetricsInner {
        GLOBAL_METRICS.get_or_init(MetricsInner::new)
    }

    /// Record a finished job run
    pub fn observe_job(&self, job: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .job_runs
            .with_label_values(&[job, outcome])
            .inc();
        self.inner()
            .job_duration_seconds
            .with_label_values(&[job])
            .observe(duration_secs);
    }

    /// Number of runs recorded for `job` with the given outcome
    pub fn job_runs(&self, job: &str, success: bool) -> u64 {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .job_runs
            .with_label_values(&[job, outcome])
            .get()
    }

    pub fn set_jobs_registered(&self, count: i64) {
        self.inner().jobs_registered.set(count);
    }

    pub fn add_files_deleted(&self, count: u64) {
        self.inner().files_deleted.inc_by(count);
    }

    pub fn add_deletion_failures(&self, count: u64) {
        self.inner().deletion_failures.inc_by(count);
    }

    pub fn record_backup(&self, bytes: u64) {
        self.inner().backups_created.inc();
        self.inner()
            .last_backup_bytes
            .set(i64::try_from(bytes).unwrap_or(i64::MAX));
    }

    /// Update host gauges from a snapshot; unavailable metrics are left untouched
    pub fn record_snapshot(&self, snapshot: &ResourceSnapshot) {
        if let Some(cpu) = snapshot.cpu_percent {
            self.inner().cpu_percent.set(cpu);
        }
        if let Some(memory) = &snapshot.memory {
            self.inner().memory_percent.set(memory.percent);
        }
        if let Some(disk) = &snapshot.disk {
            self.inner().disk_percent.set(disk.percent);
        }
    }
}

/// Structured logger for housekeeping events
///
/// Job lifecycle transitions and host events go through here so the audit
/// trail has consistent field names.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Logger tagged with the local host name
    pub fn for_local_host() -> Self {
        Self::new(sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()))
    }

    pub fn log_job_started(&self, job: &str, action: &str) {
        info!(
            event = "job_started",
            host = %self.host,
            job = %job,
            action = %action,
            "Job run started"
        );
    }

    pub fn log_job_completed(&self, job: &str, summary: &str, warnings: usize, elapsed_ms: u128) {
        if warnings > 0 {
            warn!(
                event = "job_completed",
                host = %self.host,
                job = %job,
                summary = %summary,
                warnings = warnings,
                elapsed_ms = elapsed_ms,
                "Job run completed with warnings"
            );
        } else {
            info!(
                event = "job_completed",
                host = %self.host,
                job = %job,
                summary = %summary,
                elapsed_ms = elapsed_ms,
                "Job run completed"
            );
        }
    }

    pub fn log_job_failed(&self, job: &str, err: &HousekeeperError, elapsed_ms: u128) {
        error!(
            event = "job_failed",
            host = %self.host,
            job = %job,
            error = %err,
            elapsed_ms = elapsed_ms,
            "Job run failed, will retry at next trigger"
        );
    }

    pub fn log_low_disk(&self, mount_point: &Path, free_mb: f64, min_free_mb: u64) {
        warn!(
            event = "low_disk_space",
            host = %self.host,
            mount_point = %mount_point.display(),
            free_mb = free_mb,
            min_free_mb = min_free_mb,
            "Free disk space below threshold"
        );
    }

    pub fn log_snapshot(&self, snapshot: &ResourceSnapshot) {
        info!(
            event = "resource_snapshot",
            host = %self.host,
            cpu_percent = ?snapshot.cpu_percent,
            memory_percent = ?snapshot.memory.as_ref().map(|m| m.percent),
            disk_percent = ?snapshot.disk.as_ref().map(|d| d.percent),
            process_count = ?snapshot.process_count,
            "Resource snapshot"
        );
    }

    pub fn log_startup(&self, version: &str, jobs: usize) {
        info!(
            event = "housekeeper_started",
            host = %self.host,
            version = %version,
            jobs = jobs,
            "Housekeeper started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "housekeeper_shutdown",
            host = %self.host,
            reason = %reason,
            "Housekeeper shutting down"
        );
    }
}

/// Install the global tracing subscriber
///
/// Events go to stdout and are appended to `directory/file`. The file writer
/// is non-lossy: when its buffer is full, callers block instead of dropping
/// audit lines. Keep the returned guard alive for the life of the process.
pub fn init_tracing(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory)
        .with_path("create log directory", &config.directory)?;

    let appender = tracing_appender::rolling::never(&config.directory, &config.file);
    let (file_writer, guard) = NonBlockingBuilder::default().lossy(false).finish(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer().json().with_ansi(false).with_writer(file_writer);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|e| HousekeeperError::Config(format!("tracing already initialized: {}", e)))?;
    Ok(guard)
}
