//! JSON report persistence
//!
//! Reports are written to a hidden temporary file in the target directory,
//! flushed to disk and then renamed into place, so a reader never observes a
//! partially written report.

use crate::error::{HousekeeperError, IoResultExt, Result};
use crate::models::Report;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp format embedded in report file names
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const PROBE_FILE: &str = ".housekeeper_write_probe";

/// Writes reports into a fixed directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a report: `<kind>_<YYYYMMDD_HHMMSS>.json`
    pub fn file_name(report: &Report) -> String {
        format!(
            "{}_{}.json",
            report.kind.as_str(),
            report.generated_at.format(REPORT_TIMESTAMP_FORMAT)
        )
    }

    /// Persist `report` and return the final path
    ///
    /// Fails without touching the existing file if a report of the same kind
    /// was already written within the same second.
    pub fn write(&self, report: &Report) -> Result<PathBuf> {
        let name = Self::file_name(report);
        let target = self.dir.join(&name);
        if target.exists() {
            return Err(HousekeeperError::io(
                "write report",
                target,
                io::ErrorKind::AlreadyExists.into(),
            ));
        }

        let body = serde_json::to_vec_pretty(report)?;
        let staging = self.dir.join(format!(".{}.tmp", name));

        if let Err(e) = write_synced(&staging, &body) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, &target).with_path("rename report", &target) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        info!(
            kind = %report.kind,
            path = %target.display(),
            bytes = body.len(),
            "Report written"
        );
        Ok(target)
    }

    /// Check that `dir` exists and accepts new files
    pub fn ensure_writable(dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(HousekeeperError::io(
                "probe directory",
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let probe = dir.join(PROBE_FILE);
        File::create(&probe).with_path("create probe file", &probe)?;
        fs::remove_file(&probe).with_path("remove probe file", &probe)?;

        debug!(dir = %dir.display(), "Directory is writable");
        Ok(())
    }
}

fn write_synced(path: &Path, body: &[u8]) -> Result<()> {
    let mut file = File::create(path).with_path("create report", path)?;
    file.write_all(body).with_path("write report", path)?;
    file.sync_all().with_path("sync report", path)?;
    Ok(())
}
