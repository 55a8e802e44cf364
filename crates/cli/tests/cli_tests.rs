//! CLI integration tests

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

fn hk(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hk"))
        .args(args)
        .env_remove("HOUSEKEEPER_CONFIG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute hk")
}

/// Write a config rooted in `dir` with the given extra TOML appended
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    for sub in ["monitored", "backups", "temp", "reports"] {
        fs::create_dir_all(dir.join(sub)).unwrap();
    }
    let path = dir.join("housekeeper.toml");
    let body = format!(
        "monitored_dir = '{}'\nbackup_dir = '{}'\ntemp_dir = '{}'\nreport_dir = '{}'\ncpu_sample_millis = 10\n{}",
        dir.join("monitored").display(),
        dir.join("backups").display(),
        dir.join("temp").display(),
        dir.join("reports").display(),
        extra
    );
    fs::write(&path, body).unwrap();
    path
}

fn age_file(path: &Path, days: u64) {
    let mtime = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60 + 3600);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

#[test]
fn test_cli_help() {
    let output = hk(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    for command in ["run", "run-once", "snapshot", "jobs", "cleanup", "backup", "report"] {
        assert!(stdout.contains(command), "help should list {}", command);
    }
}

#[test]
fn test_cli_version() {
    let output = hk(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("hk"));
}

#[test]
fn test_cleanup_help() {
    let output = hk(&["cleanup", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--days"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let output = hk(&["--config", missing.to_str().unwrap(), "jobs"]);

    assert!(!output.status.success());
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "poll_interval_secs = 0\n");

    let output = hk(&["--config", config.to_str().unwrap(), "jobs"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("poll_interval_secs"));
}

#[test]
fn test_duplicate_job_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[[jobs]]
name = "twice"
action = { type = "backup" }
trigger = { type = "weekly" }

[[jobs]]
name = "twice"
action = { type = "monitor" }
trigger = { type = "weekly" }
"#,
    );

    let output = hk(&["--config", config.to_str().unwrap(), "jobs"]);

    assert!(!output.status.success());
}

#[test]
fn test_jobs_json_lists_default_schedule() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let output = hk(&["--config", config.to_str().unwrap(), "--format", "json", "jobs"]);
    assert!(output.status.success());

    let jobs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = jobs
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["name"].as_str().unwrap())
        .collect();
    assert_eq!(names[0], "daily-backup");
    assert!(names.contains(&"activity-report"));
}

#[test]
fn test_cleanup_deletes_only_expired_files() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "retention_days = 30\n");
    let monitored = dir.path().join("monitored");
    for (name, days) in [("five.txt", 5), ("forty.txt", 40), ("ten.txt", 10)] {
        fs::write(monitored.join(name), name).unwrap();
        age_file(&monitored.join(name), days);
    }

    let dry = hk(&["--config", config.to_str().unwrap(), "cleanup", "--dry-run"]);
    assert!(dry.status.success());
    assert!(monitored.join("forty.txt").exists());

    let output = hk(&["--config", config.to_str().unwrap(), "--format", "json", "cleanup"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["deleted"].as_array().unwrap().len(), 1);
    assert!(!monitored.join("forty.txt").exists());
    assert!(monitored.join("five.txt").exists());
    assert!(monitored.join("ten.txt").exists());
}

#[test]
fn test_run_once_executes_configured_jobs() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[[jobs]]
name = "backup"
action = { type = "backup" }
trigger = { type = "daily", at = "09:00" }

[[jobs]]
name = "activity"
action = { type = "report_activity" }
trigger = { type = "interval", every_secs = 1800 }
"#,
    );
    fs::write(dir.path().join("monitored/a.txt"), "abc").unwrap();

    let output = hk(&["--config", config.to_str().unwrap(), "--format", "json", "run-once"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["runs"].as_array().unwrap().len(), 2);
    assert_eq!(fs::read_dir(dir.path().join("backups")).unwrap().count(), 1);
    assert_eq!(fs::read_dir(dir.path().join("reports")).unwrap().count(), 1);
}

#[test]
fn test_run_once_reports_failures_with_nonzero_exit() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[[jobs]]
name = "backup"
action = { type = "backup" }
trigger = { type = "weekly" }
"#,
    );
    // The monitored path is a file, so nothing can run
    let monitored = dir.path().join("monitored");
    fs::remove_dir(&monitored).unwrap();
    fs::write(&monitored, "not a directory").unwrap();

    let output = hk(&["--config", config.to_str().unwrap(), "run-once"]);

    assert!(!output.status.success());
}

#[cfg(unix)]
#[test]
fn test_run_stops_cleanly_on_sigterm() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    let config = write_config(
        dir.path(),
        &format!("\n[logging]\ndirectory = '{}'\n", logs.display()),
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_hk"))
        .args(["--config", config.to_str().unwrap(), "run"])
        .env_remove("HOUSEKEEPER_CONFIG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn hk run");

    let log_file = logs.join("housekeeper.log");
    let deadline = Instant::now() + Duration::from_secs(10);
    while !fs::read_to_string(&log_file)
        .map(|log| log.contains("housekeeper_started"))
        .unwrap_or(false)
    {
        assert!(Instant::now() < deadline, "hk run never logged startup");
        std::thread::sleep(Duration::from_millis(50));
    }

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("hk run did not exit after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success());
}
