//! Housekeeper configuration
//!
//! Loaded from an optional TOML file and then from `HOUSEKEEPER_*`
//! environment variables (nested keys separated by `__`). Every field has a
//! default so an empty configuration is valid.

use crate::error::{HousekeeperError, IoResultExt, Result};
use crate::report::ReportWriter;
use crate::scheduler::{Job, JobAction, JobConfig, TriggerConfig};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HOUSEKEEPER";

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "housekeeper.toml";

/// Housekeeper configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HousekeeperConfig {
    /// Directory tree that is inventoried, backed up and cleaned
    #[serde(default = "default_monitored_dir")]
    pub monitored_dir: PathBuf,

    /// Root under which `backup_<timestamp>` directories are created
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Directory holding temporary files
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Directory receiving JSON reports
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Monitored files older than this many days are deleted by cleanup
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Backups older than this many days are pruned
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: u64,

    /// Extensions removed from `temp_dir` by the temp cleanup
    #[serde(default = "default_temp_extensions")]
    pub temp_extensions: Vec<String>,

    /// Free space threshold for the disk check, in MiB
    #[serde(default = "default_min_free_disk_mb")]
    pub min_free_disk_mb: u64,

    /// Scheduler poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// CPU sampling window in milliseconds
    #[serde(default = "default_cpu_sample_millis")]
    pub cpu_sample_millis: u64,

    /// Path whose volume is reported in disk usage
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,

    /// Health/metrics API port (daemon only)
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scheduled jobs, run in this order when simultaneously due
    #[serde(default = "default_jobs")]
    pub jobs: Vec<JobConfig>,
}

/// Logging sink configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory of the append-only log file
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,

    #[serde(default = "default_log_file")]
    pub file: String,

    /// Emit JSON on stdout instead of human-readable lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
            file: default_log_file(),
            json: false,
        }
    }
}

fn default_monitored_dir() -> PathBuf {
    PathBuf::from("./monitored")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_retention_days() -> u64 {
    30
}

fn default_backup_retention_days() -> u64 {
    7
}

fn default_temp_extensions() -> Vec<String> {
    ["tmp", "temp", "log", "cache"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_free_disk_mb() -> u64 {
    100
}

fn default_poll_interval() -> u64 {
    60
}

fn default_cpu_sample_millis() -> u64 {
    1000
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_api_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_file() -> String {
    "housekeeper.log".to_string()
}

/// Default schedule: daily backup and cleanup, weekly pruning, hourly
/// system monitoring and half-hourly activity reports and disk checks
pub fn default_jobs() -> Vec<JobConfig> {
    vec![
        JobConfig::new("daily-backup", JobAction::Backup, TriggerConfig::daily("09:00")),
        JobConfig::new("daily-cleanup", JobAction::cleanup(), TriggerConfig::daily("20:00")),
        JobConfig::new("prune-backups", JobAction::prune_backups(), TriggerConfig::Weekly),
        JobConfig::new("system-monitor", JobAction::Monitor, TriggerConfig::interval_minutes(60)),
        JobConfig::new(
            "system-report",
            JobAction::ReportSystem,
            TriggerConfig::interval_minutes(60),
        ),
        JobConfig::new(
            "activity-report",
            JobAction::ReportActivity,
            TriggerConfig::interval_minutes(30),
        ),
        JobConfig::new("disk-check", JobAction::disk_check(), TriggerConfig::interval_minutes(30)),
    ]
}

impl Default for HousekeeperConfig {
    fn default() -> Self {
        Self {
            monitored_dir: default_monitored_dir(),
            backup_dir: default_backup_dir(),
            temp_dir: default_temp_dir(),
            report_dir: default_report_dir(),
            retention_days: default_retention_days(),
            backup_retention_days: default_backup_retention_days(),
            temp_extensions: default_temp_extensions(),
            min_free_disk_mb: default_min_free_disk_mb(),
            poll_interval_secs: default_poll_interval(),
            cpu_sample_millis: default_cpu_sample_millis(),
            disk_path: default_disk_path(),
            api_port: default_api_port(),
            logging: LoggingConfig::default(),
            jobs: default_jobs(),
        }
    }
}

impl HousekeeperConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// An explicitly given file must exist. The result is validated; any
    /// problem is a configuration error and should abort startup.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("temp_extensions"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve which file to load: an explicit path, else `./housekeeper.toml` if present
    pub fn resolve_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        })
    }

    /// Check invariants that do not touch the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(HousekeeperError::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.cpu_sample_millis == 0 {
            return Err(HousekeeperError::Config(
                "cpu_sample_millis must be greater than zero".to_string(),
            ));
        }
        self.build_jobs()?;
        Ok(())
    }

    /// Convert job definitions into validated jobs, rejecting duplicate names
    pub fn build_jobs(&self) -> Result<Vec<Job>> {
        let mut seen = HashSet::new();
        self.jobs
            .iter()
            .map(|job| {
                if !seen.insert(job.name.as_str()) {
                    return Err(HousekeeperError::DuplicateJob(job.name.clone()));
                }
                job.to_job()
            })
            .collect()
    }

    /// Create all working directories and probe that outputs are writable
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [
            &self.monitored_dir,
            &self.backup_dir,
            &self.temp_dir,
            &self.report_dir,
        ] {
            std::fs::create_dir_all(dir)
                .with_path("create directory", dir)
                .map_err(|e| HousekeeperError::Config(e.to_string()))?;
        }

        for dir in [&self.backup_dir, &self.report_dir] {
            ReportWriter::ensure_writable(dir).map_err(|e| {
                HousekeeperError::Config(format!("{} is not writable: {}", dir.display(), e))
            })?;
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_millis)
    }
}
