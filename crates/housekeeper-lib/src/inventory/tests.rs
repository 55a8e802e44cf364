use super::*;
use chrono::Duration;
use std::fs::{self, File};
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::TempDir;

fn write_aged(dir: &Path, name: &str, contents: &str, age: Duration) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();

    let mtime: SystemTime = (Utc::now() - age).into();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    path
}

#[test]
fn test_scan_reports_sizes_and_ages() {
    let dir = TempDir::new().unwrap();
    write_aged(dir.path(), "a.txt", "hello", Duration::days(3) + Duration::hours(1));
    fs::create_dir(dir.path().join("sub")).unwrap();
    write_aged(&dir.path().join("sub"), "b.txt", "hi", Duration::hours(2));

    let records = scan(dir.path());

    assert_eq!(records.len(), 2);
    let a = records.iter().find(|r| r.path.ends_with("a.txt")).unwrap();
    let b = records.iter().find(|r| r.path.ends_with("b.txt")).unwrap();
    assert_eq!(a.size_bytes, 5);
    assert_eq!(a.age_days, 3);
    assert_eq!(b.size_bytes, 2);
    assert_eq!(b.age_days, 0);
    assert_eq!(total_size(&records), 7);
}

#[test]
fn test_scan_missing_root_is_empty() {
    let dir = TempDir::new().unwrap();
    let records = scan(&dir.path().join("does-not-exist"));

    assert!(records.is_empty());
}

#[test]
fn test_scan_skips_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a/b/c")).unwrap();

    assert!(scan(dir.path()).is_empty());
}

#[cfg(unix)]
#[test]
fn test_scan_does_not_follow_symlinks() {
    let dir = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), "outside").unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
    fs::write(dir.path().join("inside.txt"), "inside").unwrap();

    let records = scan(dir.path());

    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("inside.txt"));
}

#[test]
fn test_list_by_extension_is_not_recursive() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("top.tmp"), "x").unwrap();
    fs::write(dir.path().join("top.txt"), "x").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/deep.tmp"), "x").unwrap();

    let records = list_by_extension(dir.path(), &["tmp".to_string()], Utc::now());

    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("top.tmp"));
}

#[test]
fn test_retention_end_to_end() {
    let dir = TempDir::new().unwrap();
    let young = write_aged(dir.path(), "young.txt", "5", Duration::days(5) + Duration::hours(1));
    let old = write_aged(dir.path(), "old.txt", "40", Duration::days(40) + Duration::hours(1));
    let mid = write_aged(dir.path(), "mid.txt", "10", Duration::days(10) + Duration::hours(1));

    let records = scan(dir.path());
    let expired = select_expired(&records, 30);
    let report = cleanup(&expired);

    assert_eq!(report.examined, 1);
    assert_eq!(report.deleted, vec![old.clone()]);
    assert!(!report.has_warnings());
    assert!(!old.exists());
    assert!(young.exists());
    assert!(mid.exists());
    assert_eq!(scan(dir.path()).len(), 2);
}

#[test]
fn test_retention_second_pass_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    write_aged(dir.path(), "old.txt", "old", Duration::days(45));
    write_aged(dir.path(), "new.txt", "new", Duration::days(1));

    let first = cleanup(&select_expired(&scan(dir.path()), 30));
    let second = cleanup(&select_expired(&scan(dir.path()), 30));

    assert_eq!(first.deleted_count(), 1);
    assert_eq!(second.deleted_count(), 0);
    assert_eq!(second.examined, 0);
}

#[test]
fn test_delete_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let record = FileRecord::new(dir.path().join("gone.txt"), 0, now, now);

    let err = delete(&record).unwrap_err();
    assert!(err.to_string().contains("gone.txt"));
}

#[test]
fn test_unreadable_walk_entry_is_dropped() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("gone");

    let mut walk = WalkDir::new(&missing).into_iter();
    let entry = walk.next().unwrap();

    assert!(entry.is_err());
    assert!(readable_entry(entry).is_none());
}

#[test]
fn test_readable_walk_entry_is_kept() {
    let dir = TempDir::new().unwrap();
    write_aged(dir.path(), "kept.tmp", "x", Duration::days(1));

    let entry = WalkDir::new(dir.path()).min_depth(1).into_iter().next().unwrap();

    let entry = readable_entry(entry).unwrap();
    assert_eq!(entry.file_name(), "kept.tmp");
}
