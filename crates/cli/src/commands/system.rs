//! Host commands: resource snapshot, disk check and reports

use anyhow::{Context, Result};
use colored::Colorize;
use housekeeper_lib::{DiskSpaceStatus, Housekeeper, HousekeeperConfig};
use serde_json::json;

use crate::output::{
    color_percent, color_status, format_timestamp, print_header, print_json, print_success,
    print_warning, OutputFormat,
};
use crate::ReportKindArg;

pub fn snapshot(config: HousekeeperConfig, format: OutputFormat) -> Result<()> {
    let snapshot = Housekeeper::new(config).snapshot();

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            print_header("Resource Snapshot");
            println!("Taken:      {}", format_timestamp(&snapshot.timestamp));
            println!(
                "CPU:        {} ({} cores)",
                color_percent(snapshot.cpu_percent),
                snapshot
                    .cpu_count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
            match &snapshot.memory {
                Some(memory) => println!(
                    "Memory:     {} ({:.2} of {:.2} GiB, {:.2} GiB available)",
                    color_percent(Some(memory.percent)),
                    memory.used_gb,
                    memory.total_gb,
                    memory.available_gb
                ),
                None => println!("Memory:     {}", "n/a".dimmed()),
            }
            match &snapshot.disk {
                Some(disk) => println!(
                    "Disk:       {} ({:.2} GiB free of {:.2} GiB on {})",
                    color_percent(Some(disk.percent)),
                    disk.free_gb,
                    disk.total_gb,
                    disk.mount_point.display()
                ),
                None => println!("Disk:       {}", "n/a".dimmed()),
            }
            println!(
                "Processes:  {}",
                snapshot
                    .process_count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }
    Ok(())
}

/// Low disk space is a warning; the command still succeeds
pub fn disk_check(
    config: HousekeeperConfig,
    min_free_mb: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let min_free_mb = min_free_mb.unwrap_or(config.min_free_disk_mb);
    let status = Housekeeper::new(config).check_disk(min_free_mb);

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => match &status {
            DiskSpaceStatus::Adequate {
                mount_point,
                free_mb,
            } => print_success(&format!(
                "{} {:.0} MiB free on {} (threshold {} MiB)",
                color_status("adequate"),
                free_mb,
                mount_point.display(),
                min_free_mb
            )),
            DiskSpaceStatus::Low {
                mount_point,
                free_mb,
            } => print_warning(&format!(
                "{} only {:.0} MiB free on {} (threshold {} MiB)",
                color_status("low"),
                free_mb,
                mount_point.display(),
                min_free_mb
            )),
            DiskSpaceStatus::Unknown => {
                print_warning(&format!("{} disk usage unavailable", color_status("unknown")))
            }
        },
    }
    Ok(())
}

pub fn report(config: HousekeeperConfig, kind: ReportKindArg, format: OutputFormat) -> Result<()> {
    config
        .prepare_directories()
        .context("Failed to prepare working directories")?;
    let housekeeper = Housekeeper::new(config);

    let path = match kind {
        ReportKindArg::Activity => housekeeper.write_activity_report(),
        ReportKindArg::System => housekeeper.write_system_report(),
    }
    .context("Failed to write report")?;

    match format {
        OutputFormat::Json => print_json(&json!({ "path": path }))?,
        OutputFormat::Table => print_success(&format!("Report written to {}", path.display())),
    }
    Ok(())
}
