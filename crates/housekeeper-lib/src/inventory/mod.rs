//! File inventory for monitored directories
//!
//! Walks a directory tree and captures size and modification time for every
//! regular file. Entries that vanish or become unreadable mid-walk are logged
//! and skipped; a missing root is an empty inventory, not an error.

mod retention;

#[cfg(test)]
mod tests;

pub use retention::{clean_temp, cleanup, delete, select_expired};

use crate::models::FileRecord;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Scan `root` recursively, computing ages against the current time
pub fn scan(root: &Path) -> Vec<FileRecord> {
    scan_at(root, Utc::now())
}

/// Scan `root` recursively, computing ages against `now`
pub fn scan_at(root: &Path, now: DateTime<Utc>) -> Vec<FileRecord> {
    if !root.exists() {
        warn!(root = %root.display(), "Scan root does not exist, nothing to inventory");
        return Vec::new();
    }

    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    let records: Vec<FileRecord> = walker
        .into_iter()
        .filter_map(readable_entry)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| record_for(&entry, now))
        .collect();

    debug!(root = %root.display(), files = records.len(), "Scan complete");
    records
}

/// List regular files directly inside `dir` whose extension is in `extensions`
///
/// Extensions match case-insensitively, with or without a leading dot.
pub fn list_by_extension(dir: &Path, extensions: &[String], now: DateTime<Utc>) -> Vec<FileRecord> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "Directory does not exist, nothing to list");
        return Vec::new();
    }

    let wanted: Vec<String> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable_entry)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .filter_map(|entry| record_for(&entry, now))
        .collect()
}

/// Sum of `size_bytes` over `records`
pub fn total_size(records: &[FileRecord]) -> u64 {
    records.iter().map(|r| r.size_bytes).sum()
}

/// Unwrap a walk result, logging and dropping entries that could not be read
fn readable_entry(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(
                path = ?e.path(),
                error = %e,
                "Skipping unreadable entry"
            );
            None
        }
    }
}

fn record_for(entry: &DirEntry, now: DateTime<Utc>) -> Option<FileRecord> {
    let metadata = match entry.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            // Usually a concurrent delete between readdir and stat
            warn!(path = %entry.path().display(), error = %e, "Skipping file without metadata");
            return None;
        }
    };

    let modified = match metadata.modified() {
        Ok(modified) => DateTime::<Utc>::from(modified),
        Err(e) => {
            warn!(path = %entry.path().display(), error = %e, "Skipping file without mtime");
            return None;
        }
    };

    Some(FileRecord::new(entry.path(), metadata.len(), modified, now))
}
