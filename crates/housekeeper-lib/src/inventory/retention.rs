//! Age-based retention policy and deletion batches

use super::list_by_extension;
use crate::error::{IoResultExt, Result};
use crate::models::{CleanupReport, FileRecord};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Select records strictly older than `max_age_days`
///
/// With `max_age_days = 0` every record at least one day old is selected.
pub fn select_expired(records: &[FileRecord], max_age_days: u64) -> Vec<FileRecord> {
    records
        .iter()
        .filter(|record| record.age_days > max_age_days)
        .cloned()
        .collect()
}

/// Delete the file behind a single record
pub fn delete(record: &FileRecord) -> Result<()> {
    std::fs::remove_file(&record.path).with_path("delete file", &record.path)
}

/// Delete every record, continuing past individual failures
pub fn cleanup(records: &[FileRecord]) -> CleanupReport {
    let mut report = CleanupReport {
        examined: records.len(),
        ..Default::default()
    };

    for record in records {
        match delete(record) {
            Ok(()) => {
                info!(
                    path = %record.path.display(),
                    age_days = record.age_days,
                    "Deleted file"
                );
                report.deleted.push(record.path.clone());
            }
            Err(e) => {
                warn!(
                    event = "file_operation_failed",
                    op = "delete",
                    path = %record.path.display(),
                    error = %e,
                    "Failed to delete file, continuing batch"
                );
                report.failures.push((record.path.clone(), e.to_string()));
            }
        }
    }

    report
}

/// Delete temporary files in `dir` matching `extensions`
pub fn clean_temp(dir: &Path, extensions: &[String], now: DateTime<Utc>) -> CleanupReport {
    let candidates = list_by_extension(dir, extensions, now);
    cleanup(&candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn records_with_ages(ages: &[u64]) -> Vec<FileRecord> {
        let now = Utc::now();
        ages.iter()
            .enumerate()
            .map(|(i, age)| {
                FileRecord::new(
                    format!("/data/file{}.txt", i),
                    100,
                    now - Duration::days(*age as i64) - Duration::minutes(1),
                    now,
                )
            })
            .collect()
    }

    fn paths(records: &[FileRecord]) -> HashSet<PathBuf> {
        records.iter().map(|r| r.path.clone()).collect()
    }

    #[test]
    fn test_select_expired_is_strictly_greater() {
        let records = records_with_ages(&[29, 30, 31, 100]);
        let expired = select_expired(&records, 30);

        let ages: Vec<u64> = expired.iter().map(|r| r.age_days).collect();
        assert_eq!(ages, vec![31, 100]);
    }

    #[test]
    fn test_select_expired_matches_predicate_for_all_thresholds() {
        let records = records_with_ages(&[0, 1, 2, 5, 7, 30, 45]);

        for threshold in 0..50 {
            let expired = select_expired(&records, threshold);
            let expected: HashSet<PathBuf> = records
                .iter()
                .filter(|r| r.age_days > threshold)
                .map(|r| r.path.clone())
                .collect();
            assert_eq!(paths(&expired), expected, "threshold {}", threshold);
        }
    }

    #[test]
    fn test_select_expired_is_idempotent() {
        let records = records_with_ages(&[3, 40, 12, 90]);

        let first = select_expired(&records, 10);
        let second = select_expired(&records, 10);
        let reapplied = select_expired(&first, 10);

        assert_eq!(first, second);
        assert_eq!(first, reapplied);
    }

    #[test]
    fn test_select_expired_zero_threshold_boundary() {
        let records = records_with_ages(&[0, 1, 2, 365]);
        let expired = select_expired(&records, 0);

        // Age 0 is not strictly greater than 0
        let ages: Vec<u64> = expired.iter().map(|r| r.age_days).collect();
        assert_eq!(ages, vec![1, 2, 365]);
    }

    #[test]
    fn test_select_expired_empty_input() {
        assert!(select_expired(&[], 30).is_empty());
    }

    #[test]
    fn test_cleanup_continues_past_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("present.txt");
        std::fs::write(&present, "data").unwrap();

        let now = Utc::now();
        let records = vec![
            FileRecord::new(dir.path().join("missing.txt"), 0, now, now),
            FileRecord::new(&present, 4, now, now),
        ];

        let report = cleanup(&records);

        assert_eq!(report.examined, 2);
        assert_eq!(report.deleted, vec![present.clone()]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.has_warnings());
        assert!(!present.exists());
    }

    #[test]
    fn test_clean_temp_only_removes_matching_extensions() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["a.tmp", "b.TEMP", "c.log", "keep.txt", "d.cache"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.tmp")).unwrap();

        let extensions: Vec<String> = [".tmp", "temp", "log", "cache"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = clean_temp(dir.path(), &extensions, Utc::now());

        assert_eq!(report.deleted_count(), 4);
        assert!(dir.path().join("keep.txt").exists());
        assert!(dir.path().join("nested.tmp").is_dir());
    }
}
