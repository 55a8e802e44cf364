//! Housekeeping operations bound to a configuration
//!
//! [`Housekeeper`] wires the inventory, retention, backup, monitor and report
//! components to the configured directories and thresholds. It is the
//! scheduler's [`JobExecutor`] and also backs the one-shot CLI commands.

use crate::backup;
use crate::config::HousekeeperConfig;
use crate::error::Result;
use crate::inventory;
use crate::models::{
    ActivitySummary, BackupSummary, CleanupReport, FileRecord, Report, ResourceSnapshot,
};
use crate::monitor::{DiskSpaceStatus, ResourceMonitor};
use crate::observability::{HousekeeperMetrics, StructuredLogger};
use crate::report::ReportWriter;
use crate::scheduler::{JobAction, JobExecutor, JobOutcome};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

pub struct Housekeeper {
    config: HousekeeperConfig,
    monitor: Mutex<ResourceMonitor>,
    reports: ReportWriter,
    metrics: Option<HousekeeperMetrics>,
    logger: StructuredLogger,
}

impl Housekeeper {
    pub fn new(config: HousekeeperConfig) -> Self {
        let monitor = ResourceMonitor::new(config.cpu_sample_window(), config.disk_path.clone());
        let reports = ReportWriter::new(config.report_dir.clone());
        Self {
            config,
            monitor: Mutex::new(monitor),
            reports,
            metrics: None,
            logger: StructuredLogger::for_local_host(),
        }
    }

    /// Attach metrics and a logger shared with the scheduler
    pub fn with_observability(mut self, metrics: HousekeeperMetrics, logger: StructuredLogger) -> Self {
        self.metrics = Some(metrics);
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &HousekeeperConfig {
        &self.config
    }

    fn monitor(&self) -> MutexGuard<'_, ResourceMonitor> {
        self.monitor.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inventory of the monitored directory
    pub fn inventory(&self) -> ActivitySummary {
        let files = inventory::scan(&self.config.monitored_dir);
        ActivitySummary::from_records(self.config.monitored_dir.clone(), files)
    }

    /// Monitored files older than `max_age_days`, without deleting them
    pub fn expired(&self, max_age_days: u64) -> Vec<FileRecord> {
        let records = inventory::scan(&self.config.monitored_dir);
        inventory::select_expired(&records, max_age_days)
    }

    /// Delete monitored files older than `max_age_days`
    pub fn cleanup(&self, max_age_days: u64) -> CleanupReport {
        let report = inventory::cleanup(&self.expired(max_age_days));
        self.record_cleanup(&report);
        report
    }

    pub fn clean_temp(&self) -> CleanupReport {
        let report = inventory::clean_temp(
            &self.config.temp_dir,
            &self.config.temp_extensions,
            Utc::now(),
        );
        self.record_cleanup(&report);
        report
    }

    pub fn backup(&self) -> Result<BackupSummary> {
        let summary = backup::backup(&self.config.monitored_dir, &self.config.backup_dir)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_backup(summary.bytes);
        }
        Ok(summary)
    }

    pub fn prune_backups(&self, max_age_days: u64) -> CleanupReport {
        let report = backup::prune_backups(&self.config.backup_dir, max_age_days, Utc::now());
        self.record_cleanup(&report);
        report
    }

    /// Sample host resources; blocks for the CPU sampling window
    pub fn snapshot(&self) -> ResourceSnapshot {
        let snapshot = self.monitor().sample();
        if let Some(metrics) = &self.metrics {
            metrics.record_snapshot(&snapshot);
        }
        snapshot
    }

    /// Check free space on the monitored volume, logging when it is low
    pub fn check_disk(&self, min_free_mb: u64) -> DiskSpaceStatus {
        let status = self.monitor().check_disk_space(min_free_mb);
        if let DiskSpaceStatus::Low {
            mount_point,
            free_mb,
        } = &status
        {
            self.logger.log_low_disk(mount_point, *free_mb, min_free_mb);
        }
        status
    }

    pub fn write_activity_report(&self) -> Result<PathBuf> {
        let report = Report::activity(Utc::now(), self.inventory());
        self.reports.write(&report)
    }

    pub fn write_system_report(&self) -> Result<PathBuf> {
        let report = Report::system(self.snapshot());
        self.reports.write(&report)
    }

    fn record_cleanup(&self, report: &CleanupReport) {
        if let Some(metrics) = &self.metrics {
            metrics.add_files_deleted(report.deleted.len() as u64);
            metrics.add_deletion_failures(report.failures.len() as u64);
        }
    }
}

fn cleanup_outcome(what: &str, report: CleanupReport) -> JobOutcome {
    let warnings = report
        .failures
        .iter()
        .map(|(path, reason)| format!("{}: {}", path.display(), reason))
        .collect();
    JobOutcome::new(format!(
        "deleted {} of {} {}",
        report.deleted_count(),
        report.examined,
        what
    ))
    .with_warnings(warnings)
}

impl JobExecutor for Housekeeper {
    fn execute(&self, _job: &str, action: &JobAction) -> Result<JobOutcome> {
        let outcome = match action {
            JobAction::Backup => {
                let summary = self.backup()?;
                JobOutcome::new(format!(
                    "backed up {} files ({} bytes) to {}",
                    summary.files,
                    summary.bytes,
                    summary.path.display()
                ))
            }
            JobAction::Cleanup { max_age_days } => {
                let days = max_age_days.unwrap_or(self.config.retention_days);
                cleanup_outcome("expired files", self.cleanup(days))
            }
            JobAction::PruneBackups { max_age_days } => {
                let days = max_age_days.unwrap_or(self.config.backup_retention_days);
                cleanup_outcome("backups", self.prune_backups(days))
            }
            JobAction::CleanTemp => cleanup_outcome("temporary files", self.clean_temp()),
            JobAction::ReportActivity => {
                let path = self.write_activity_report()?;
                JobOutcome::new(format!("activity report written to {}", path.display()))
            }
            JobAction::ReportSystem => {
                let path = self.write_system_report()?;
                JobOutcome::new(format!("system report written to {}", path.display()))
            }
            JobAction::Monitor => {
                let snapshot = self.snapshot();
                self.logger.log_snapshot(&snapshot);
                JobOutcome::new(format!(
                    "cpu {} memory {} disk {}",
                    format_percent(snapshot.cpu_percent),
                    format_percent(snapshot.memory.as_ref().map(|m| m.percent)),
                    format_percent(snapshot.disk.as_ref().map(|d| d.percent)),
                ))
            }
            JobAction::DiskCheck { min_free_mb } => {
                let min = min_free_mb.unwrap_or(self.config.min_free_disk_mb);
                match self.check_disk(min) {
                    DiskSpaceStatus::Adequate { free_mb, .. } => {
                        JobOutcome::new(format!("{:.0} MiB free", free_mb))
                    }
                    DiskSpaceStatus::Low { free_mb, .. } => {
                        JobOutcome::new(format!("{:.0} MiB free", free_mb)).with_warnings(vec![
                            format!("free space below {} MiB", min),
                        ])
                    }
                    DiskSpaceStatus::Unknown => JobOutcome::new("disk usage unavailable")
                        .with_warnings(vec!["disk usage could not be read".to_string()]),
                }
            }
        };
        Ok(outcome)
    }
}

fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}
