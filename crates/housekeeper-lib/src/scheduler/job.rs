//! Job definitions and the executor seam

use super::trigger::{Trigger, TriggerConfig};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Action to execute when a job is due
///
/// Unset parameters fall back to the configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobAction {
    /// Snapshot the monitored directory into the backup directory
    Backup,
    /// Delete monitored files older than the retention threshold
    Cleanup {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_age_days: Option<u64>,
    },
    /// Delete backups older than the backup retention threshold
    PruneBackups {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_age_days: Option<u64>,
    },
    /// Delete temporary files by extension
    CleanTemp,
    /// Persist an inventory of the monitored directory
    ReportActivity,
    /// Persist a resource snapshot
    ReportSystem,
    /// Sample resources and log the snapshot
    Monitor,
    /// Warn when free disk space is below a threshold
    DiskCheck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_free_mb: Option<u64>,
    },
}

impl JobAction {
    pub fn cleanup() -> Self {
        Self::Cleanup { max_age_days: None }
    }

    pub fn prune_backups() -> Self {
        Self::PruneBackups { max_age_days: None }
    }

    pub fn disk_check() -> Self {
        Self::DiskCheck { min_free_mb: None }
    }

    /// Stable label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            JobAction::Backup => "backup",
            JobAction::Cleanup { .. } => "cleanup",
            JobAction::PruneBackups { .. } => "prune_backups",
            JobAction::CleanTemp => "clean_temp",
            JobAction::ReportActivity => "report_activity",
            JobAction::ReportSystem => "report_system",
            JobAction::Monitor => "monitor",
            JobAction::DiskCheck { .. } => "disk_check",
        }
    }
}

/// A named, schedulable unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub action: JobAction,
    pub trigger: Trigger,
}

impl Job {
    pub fn new(name: impl Into<String>, action: JobAction, trigger: Trigger) -> Self {
        Self {
            name: name.into(),
            action,
            trigger,
        }
    }
}

/// Job definition as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub action: JobAction,
    pub trigger: TriggerConfig,
}

impl JobConfig {
    pub fn new(name: impl Into<String>, action: JobAction, trigger: TriggerConfig) -> Self {
        Self {
            name: name.into(),
            action,
            trigger,
        }
    }

    /// Validate and convert into a runnable [`Job`]
    pub fn to_job(&self) -> Result<Job> {
        let trigger = self.trigger.to_trigger(&self.name)?;
        Ok(Job::new(self.name.clone(), self.action.clone(), trigger))
    }
}

/// Outcome of a successful job run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutcome {
    /// One-line summary for logs and CLI output
    pub summary: String,
    /// Non-fatal problems (e.g. files that could not be deleted)
    pub warnings: Vec<String>,
}

impl JobOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Per-job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Due,
    Running,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::Due => "due",
            JobState::Running => "running",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Trait for job action implementations
///
/// Actions run synchronously and to completion; the scheduler does not
/// interrupt them.
pub trait JobExecutor: Send + Sync {
    /// Execute `action` on behalf of the job named `job`
    fn execute(&self, job: &str, action: &JobAction) -> Result<JobOutcome>;
}
