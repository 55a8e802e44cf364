//! Timestamped directory backups
//!
//! A backup copies the monitored tree into `backup_<YYYYMMDD_HHMMSS>` under the
//! destination root. The tree is first staged in a hidden `.partial`
//! directory and renamed into place once every file has been copied, so a
//! `backup_*` directory is always complete.

use crate::error::{HousekeeperError, IoResultExt, Result};
use crate::models::{BackupSummary, CleanupReport};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Name prefix of completed backup directories
pub const BACKUP_PREFIX: &str = "backup_";

/// Timestamp format embedded in backup directory names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Back up `source` into a new directory under `destination_root`
pub fn backup(source: &Path, destination_root: &Path) -> Result<BackupSummary> {
    backup_at(source, destination_root, Utc::now())
}

/// Back up `source`, naming the destination after `now`
pub fn backup_at(
    source: &Path,
    destination_root: &Path,
    now: DateTime<Utc>,
) -> Result<BackupSummary> {
    if !source.is_dir() {
        return Err(HousekeeperError::io(
            "read backup source",
            source,
            io::Error::new(io::ErrorKind::NotFound, "source is not a directory"),
        ));
    }

    let name = backup_name(now);
    let target = destination_root.join(&name);
    if target.exists() {
        return Err(HousekeeperError::BackupCollision(target));
    }

    fs::create_dir_all(destination_root).with_path("create backup root", destination_root)?;

    let staging = destination_root.join(format!(".{}.partial", name));
    if staging.exists() {
        // Leftover from an interrupted run with the same timestamp
        fs::remove_dir_all(&staging).with_path("remove stale staging", &staging)?;
    }
    fs::create_dir(&staging).with_path("create staging directory", &staging)?;

    let copied = copy_tree(source, &staging, destination_root).and_then(|summary| {
        fs::rename(&staging, &target).with_path("finalize backup", &target)?;
        Ok(summary)
    });

    match copied {
        Ok((files, bytes)) => {
            info!(
                source = %source.display(),
                path = %target.display(),
                files = files,
                bytes = bytes,
                "Backup completed"
            );
            Ok(BackupSummary {
                path: target,
                files,
                bytes,
            })
        }
        Err(e) => {
            if let Err(cleanup_err) = fs::remove_dir_all(&staging) {
                warn!(
                    path = %staging.display(),
                    error = %cleanup_err,
                    "Failed to remove partial backup"
                );
            }
            Err(e)
        }
    }
}

/// Directory name for a backup taken at `now`
pub fn backup_name(now: DateTime<Utc>) -> String {
    format!("{}{}", BACKUP_PREFIX, now.format(BACKUP_TIMESTAMP_FORMAT))
}

/// Remove `backup_*` directories older than `max_age_days`
///
/// Age comes from the timestamp in the directory name, falling back to the
/// directory mtime when the name does not parse. Failures are recorded and
/// the remaining backups are still examined.
pub fn prune_backups(
    destination_root: &Path,
    max_age_days: u64,
    now: DateTime<Utc>,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let entries = match fs::read_dir(destination_root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                path = %destination_root.display(),
                error = %e,
                "Cannot read backup root, nothing to prune"
            );
            return report;
        }
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(
                    path = %destination_root.display(),
                    error = %e,
                    "Skipping unreadable backup root entry"
                );
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(BACKUP_PREFIX))
        .map(|entry| entry.path())
        .collect();
    backups.sort();

    for path in backups {
        report.examined += 1;

        let Some(taken_at) = backup_time(&path) else {
            warn!(path = %path.display(), "Cannot determine backup age, skipping");
            continue;
        };
        let age_days = (now - taken_at).num_days();
        if age_days <= i64::try_from(max_age_days).unwrap_or(i64::MAX) {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(path = %path.display(), age_days = age_days, "Pruned old backup");
                report.deleted.push(path);
            }
            Err(e) => {
                warn!(
                    event = "file_operation_failed",
                    op = "prune_backup",
                    path = %path.display(),
                    error = %e,
                    "Failed to prune backup, continuing"
                );
                report.failures.push((path, e.to_string()));
            }
        }
    }

    report
}

fn backup_time(path: &Path) -> Option<DateTime<Utc>> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_prefix(BACKUP_PREFIX)?;

    match NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT) {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from),
    }
}

/// Copy the contents of `source` into `dest`, returning (files, bytes)
///
/// Anything under `exclude` is skipped so a backup root nested inside the
/// source is not copied into itself.
fn copy_tree(source: &Path, dest: &Path, exclude: &Path) -> Result<(usize, u64)> {
    let exclude = fs::canonicalize(exclude).unwrap_or_else(|_| exclude.to_path_buf());
    let mut files = 0usize;
    let mut bytes = 0u64;

    let walker = WalkDir::new(source)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            fs::canonicalize(entry.path())
                .map(|p| !p.starts_with(&exclude))
                .unwrap_or(true)
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            HousekeeperError::io("walk backup source", path, e.into())
        })?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| HousekeeperError::Execution(e.to_string()))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).with_path("create backup directory", &target)?;
        } else if file_type.is_file() {
            bytes += copy_file(entry.path(), &target)?;
            files += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        }
    }

    debug!(files = files, bytes = bytes, "Backup tree copied");
    Ok((files, bytes))
}

fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    let copied = fs::copy(from, to).with_path("copy file", from)?;

    let modified = fs::metadata(from)
        .and_then(|m| m.modified())
        .with_path("read mtime", from)?;
    File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .with_path("preserve mtime", to)?;

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = fs::read_link(from).with_path("read symlink", from)?;
    std::os::unix::fs::symlink(&link, to).with_path("create symlink", to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> Result<()> {
    warn!(path = %from.display(), "Skipping symlink in backup");
    Ok(())
}
