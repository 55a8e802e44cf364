//! File lifecycle commands: inventory, backup and retention

use anyhow::{Context, Result};
use colored::Colorize;
use housekeeper_lib::{CleanupReport, FileRecord, Housekeeper, HousekeeperConfig};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    format_bytes, format_timestamp, print_header, print_info, print_json, print_rows,
    print_success, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Age (days)")]
    age_days: u64,
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        Self {
            path: record.path.display().to_string(),
            size: format_bytes(record.size_bytes),
            modified: format_timestamp(&record.modified_at),
            age_days: record.age_days,
        }
    }
}

/// JSON shape for `cleanup --dry-run`
#[derive(Serialize)]
struct DryRun<'a> {
    max_age_days: u64,
    would_delete: &'a [FileRecord],
}

pub fn inventory(config: HousekeeperConfig, format: OutputFormat) -> Result<()> {
    let summary = Housekeeper::new(config).inventory();

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_header("Monitored Files");
            println!("Root: {}\n", summary.root.display().to_string().cyan());
            print_rows(
                summary.files.iter().map(FileRow::from).collect(),
                "No files found",
            );
            println!(
                "\nTotal: {} files, {}",
                summary.total_files,
                format_bytes(summary.total_bytes)
            );
        }
    }
    Ok(())
}

pub fn backup(config: HousekeeperConfig, format: OutputFormat) -> Result<()> {
    config
        .prepare_directories()
        .context("Failed to prepare working directories")?;

    let summary = Housekeeper::new(config)
        .backup()
        .context("Backup failed")?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_success(&format!(
            "Backed up {} files ({}) to {}",
            summary.files,
            format_bytes(summary.bytes),
            summary.path.display()
        )),
    }
    Ok(())
}

pub fn cleanup(
    config: HousekeeperConfig,
    days: Option<u64>,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let days = days.unwrap_or(config.retention_days);
    let housekeeper = Housekeeper::new(config);

    if dry_run {
        let expired = housekeeper.expired(days);
        match format {
            OutputFormat::Json => print_json(&DryRun {
                max_age_days: days,
                would_delete: &expired,
            })?,
            OutputFormat::Table => {
                print_header(&format!("Files older than {} days", days));
                print_rows(
                    expired.iter().map(FileRow::from).collect(),
                    "Nothing to delete",
                );
                print_info("Dry run, nothing was deleted");
            }
        }
        return Ok(());
    }

    let report = housekeeper.cleanup(days);
    print_cleanup(&report, "expired files", format)
}

pub fn clean_temp(config: HousekeeperConfig, format: OutputFormat) -> Result<()> {
    let report = Housekeeper::new(config).clean_temp();
    print_cleanup(&report, "temporary files", format)
}

pub fn prune_backups(
    config: HousekeeperConfig,
    days: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let days = days.unwrap_or(config.backup_retention_days);
    let report = Housekeeper::new(config).prune_backups(days);
    print_cleanup(&report, "backups", format)
}

/// Partial failures are reported as warnings, not as a failed command
fn print_cleanup(report: &CleanupReport, what: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            for path in &report.deleted {
                println!("  {} {}", "-".red(), path.display());
            }
            for (path, reason) in &report.failures {
                print_warning(&format!("Could not delete {}: {}", path.display(), reason));
            }
            print_success(&format!(
                "Deleted {} of {} {}",
                report.deleted_count(),
                report.examined,
                what
            ));
        }
    }
    Ok(())
}
