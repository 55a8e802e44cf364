//! Housekeeper CLI
//!
//! Runs the housekeeping scheduler in the foreground, or any single
//! housekeeping operation on demand.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{files, scheduler, system};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Housekeeper CLI
#[derive(Parser)]
#[command(name = "hk")]
#[command(author, version, about = "Housekeeper: scheduled backups, retention and reports", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/housekeeper/housekeeper.toml, then ./housekeeper.toml)
    #[arg(long, short, env = "HOUSEKEEPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler in the foreground until interrupted
    Run,

    /// Run every configured job once, in registration order
    RunOnce,

    /// Show configured jobs and when they are next due
    Jobs,

    /// Take a resource snapshot of this host
    Snapshot,

    /// List files in the monitored directory
    Inventory,

    /// Back up the monitored directory now
    Backup,

    /// Delete monitored files older than the retention threshold
    Cleanup {
        /// Retention threshold in days (defaults to retention_days)
        #[arg(long)]
        days: Option<u64>,

        /// List the files that would be deleted without deleting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete temporary files by extension
    CleanTemp,

    /// Delete backups older than the backup retention threshold
    PruneBackups {
        /// Backup retention in days (defaults to backup_retention_days)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Check free space on the monitored volume
    DiskCheck {
        /// Threshold in MiB (defaults to min_free_disk_mb)
        #[arg(long)]
        min_free_mb: Option<u64>,
    },

    /// Write a report now
    Report {
        /// Report kind
        #[arg(value_enum)]
        kind: ReportKindArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportKindArg {
    /// Inventory of the monitored directory
    Activity,
    /// Host resource snapshot
    System,
}

/// Stderr logging for one-shot commands; `run` installs the full sink instead
fn init_stderr_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Run) {
        init_stderr_logging(cli.verbose);
    }

    let config = config::load(cli.config)?;
    let format = cli.format;

    match cli.command {
        Commands::Run => scheduler::run(config).await?,
        Commands::RunOnce => scheduler::run_once(config, format)?,
        Commands::Jobs => scheduler::list_jobs(config, format)?,
        Commands::Snapshot => system::snapshot(config, format)?,
        Commands::Inventory => files::inventory(config, format)?,
        Commands::Backup => files::backup(config, format)?,
        Commands::Cleanup { days, dry_run } => files::cleanup(config, days, dry_run, format)?,
        Commands::CleanTemp => files::clean_temp(config, format)?,
        Commands::PruneBackups { days } => files::prune_backups(config, days, format)?,
        Commands::DiskCheck { min_free_mb } => system::disk_check(config, min_free_mb, format)?,
        Commands::Report { kind } => system::report(config, kind, format)?,
    }

    Ok(())
}
