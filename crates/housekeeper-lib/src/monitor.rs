//! Host resource sampling
//!
//! Wraps a long-lived `sysinfo::System` so successive CPU samples are deltas
//! over the sampling window. Metrics the platform cannot provide are `None`.

use crate::models::{DiskUsage, MemoryUsage, ResourceSnapshot, BYTES_PER_GB};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{Disks, ProcessesToUpdate, System};
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Result of comparing free disk space against a threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiskSpaceStatus {
    Adequate { mount_point: PathBuf, free_mb: f64 },
    Low { mount_point: PathBuf, free_mb: f64 },
    /// Disk usage could not be read for the configured path
    Unknown,
}

impl DiskSpaceStatus {
    pub fn is_low(&self) -> bool {
        matches!(self, DiskSpaceStatus::Low { .. })
    }
}

/// Samples CPU, memory, disk and process counts
pub struct ResourceMonitor {
    system: System,
    cpu_window: Duration,
    disk_path: PathBuf,
}

impl ResourceMonitor {
    /// Create a monitor sampling CPU over `cpu_window` and reporting the
    /// volume that holds `disk_path`
    pub fn new(cpu_window: Duration, disk_path: impl Into<PathBuf>) -> Self {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            warn!("Resource monitoring is not supported on this platform, snapshots will be empty");
        }
        Self {
            system: System::new(),
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
            disk_path: disk_path.into(),
        }
    }

    pub fn cpu_window(&self) -> Duration {
        self.cpu_window
    }

    /// Take a snapshot; blocks for the CPU sampling window
    pub fn sample(&mut self) -> ResourceSnapshot {
        let (cpu_percent, cpu_count) = self.sample_cpu();
        let memory = self.sample_memory();
        let disk = self.disk_usage();
        let process_count = self.sample_processes();

        let snapshot = ResourceSnapshot {
            timestamp: Utc::now(),
            cpu_percent,
            cpu_count,
            memory,
            disk,
            process_count,
        };
        debug!(?snapshot, "Resource snapshot taken");
        snapshot
    }

    /// Compare free space on the monitored volume with `min_free_mb`
    pub fn check_disk_space(&self, min_free_mb: u64) -> DiskSpaceStatus {
        match self.disk_usage() {
            Some(disk) => classify_free_space(disk, min_free_mb),
            None => DiskSpaceStatus::Unknown,
        }
    }

    fn sample_cpu(&mut self) -> (Option<f64>, Option<usize>) {
        self.system.refresh_cpu_usage();
        std::thread::sleep(self.cpu_window);
        self.system.refresh_cpu_usage();

        let count = self.system.cpus().len();
        if count == 0 {
            return (None, None);
        }
        let usage = f64::from(self.system.global_cpu_usage());
        let percent = usage.is_finite().then(|| usage.clamp(0.0, 100.0));
        (percent, Some(count))
    }

    fn sample_memory(&mut self) -> Option<MemoryUsage> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        let used = self.system.used_memory().min(total);
        let available = self.system.available_memory().min(total);

        Some(MemoryUsage {
            total_gb: total as f64 / BYTES_PER_GB,
            used_gb: used as f64 / BYTES_PER_GB,
            available_gb: available as f64 / BYTES_PER_GB,
            percent: percent_of(used, total),
        })
    }

    fn sample_processes(&mut self) -> Option<usize> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        let count = self.system.processes().len();
        (count > 0).then_some(count)
    }

    fn disk_usage(&self) -> Option<DiskUsage> {
        let disks = Disks::new_with_refreshed_list();
        let target = std::fs::canonicalize(&self.disk_path).unwrap_or_else(|_| self.disk_path.clone());

        let mount = select_mount(&target, disks.iter().map(|d| d.mount_point()))?.to_path_buf();
        let disk = disks.iter().find(|d| d.mount_point() == mount.as_path())?;
        usage_from_space(mount, disk.total_space(), disk.available_space())
    }
}

/// Pick the longest mount point that contains `path`
fn select_mount<'a>(path: &Path, mounts: impl IntoIterator<Item = &'a Path>) -> Option<&'a Path> {
    mounts
        .into_iter()
        .filter(|mount| path.starts_with(mount))
        .max_by_key(|mount| mount.as_os_str().len())
}

fn usage_from_space(mount_point: PathBuf, total: u64, available: u64) -> Option<DiskUsage> {
    if total == 0 {
        return None;
    }
    let free = available.min(total);
    let used = total - free;

    Some(DiskUsage {
        mount_point,
        total_gb: total as f64 / BYTES_PER_GB,
        used_gb: used as f64 / BYTES_PER_GB,
        free_gb: free as f64 / BYTES_PER_GB,
        percent: percent_of(used, total),
    })
}

fn classify_free_space(disk: DiskUsage, min_free_mb: u64) -> DiskSpaceStatus {
    let free_mb = disk.free_gb * BYTES_PER_GB / BYTES_PER_MB;
    if free_mb < min_free_mb as f64 {
        DiskSpaceStatus::Low {
            mount_point: disk.mount_point,
            free_mb,
        }
    } else {
        DiskSpaceStatus::Adequate {
            mount_point: disk.mount_point,
            free_mb,
        }
    }
}

fn percent_of(part: u64, total: u64) -> f64 {
    (part as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
