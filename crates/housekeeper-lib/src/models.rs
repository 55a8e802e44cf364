//! Core data models for the housekeeper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bytes per gibibyte, used for all `*_gb` fields
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Metadata for a single regular file, captured during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    /// Whole days elapsed between `modified_at` and the scan time
    pub age_days: u64,
}

impl FileRecord {
    /// Build a record, deriving `age_days` relative to `now`
    pub fn new(
        path: impl Into<PathBuf>,
        size_bytes: u64,
        modified_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        // Files modified in the future (clock skew) count as age 0
        let age_days = (now - modified_at).num_days().max(0) as u64;
        Self {
            path: path.into(),
            size_bytes,
            modified_at,
            age_days,
        }
    }
}

/// Memory usage at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_gb: f64,
    pub used_gb: f64,
    pub available_gb: f64,
    pub percent: f64,
}

/// Disk usage for one volume at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}

/// Point-in-time capture of host resource usage
///
/// Any metric the platform cannot provide is `None` rather than failing the
/// whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: Option<f64>,
    pub cpu_count: Option<usize>,
    pub memory: Option<MemoryUsage>,
    pub disk: Option<DiskUsage>,
    pub process_count: Option<usize>,
}

/// Inventory of a monitored directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub root: PathBuf,
    pub total_files: usize,
    pub total_bytes: u64,
    pub files: Vec<FileRecord>,
}

impl ActivitySummary {
    pub fn from_records(root: impl Into<PathBuf>, files: Vec<FileRecord>) -> Self {
        let total_bytes = files.iter().map(|f| f.size_bytes).sum();
        Self {
            root: root.into(),
            total_files: files.len(),
            total_bytes,
            files,
        }
    }
}

/// Kind of persisted report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    ActivitySummary,
    SystemSummary,
}

impl ReportKind {
    /// File name prefix for reports of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ActivitySummary => "activity_summary",
            ReportKind::SystemSummary => "system_summary",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportPayload {
    Activity(ActivitySummary),
    System(ResourceSnapshot),
}

/// A persisted serialization of an inventory or a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub kind: ReportKind,
    pub payload: ReportPayload,
}

impl Report {
    pub fn activity(generated_at: DateTime<Utc>, summary: ActivitySummary) -> Self {
        Self {
            generated_at,
            kind: ReportKind::ActivitySummary,
            payload: ReportPayload::Activity(summary),
        }
    }

    pub fn system(snapshot: ResourceSnapshot) -> Self {
        Self {
            generated_at: snapshot.timestamp,
            kind: ReportKind::SystemSummary,
            payload: ReportPayload::System(snapshot),
        }
    }
}

/// Outcome of a deletion batch
///
/// A batch never aborts on a single failure; callers inspect `failures` to
/// tell a clean run from a success-with-warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub examined: usize,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn has_warnings(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Result of a completed backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub files: usize,
    pub bytes: u64,
}
