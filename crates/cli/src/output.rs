//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Render rows as a rounded table
pub fn print_rows<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format an optional percentage, `n/a` when unavailable
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    }
}

pub fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Color a usage percentage by pressure
pub fn color_percent(value: Option<f64>) -> String {
    let formatted = format_percent(value);
    match value {
        Some(v) if v >= 90.0 => formatted.red().to_string(),
        Some(v) if v >= 75.0 => formatted.yellow().to_string(),
        Some(_) => formatted.green().to_string(),
        None => formatted.dimmed().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "idle" | "ok" | "adequate" | "healthy" => status.green().to_string(),
        "due" | "running" => status.blue().to_string(),
        "warning" | "low" | "degraded" | "unknown" => status.yellow().to_string(),
        "failed" | "error" | "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00Ki");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00Mi");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00Gi");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(42.34)), "42.3%");
        assert_eq!(format_percent(None), "n/a");
    }
}
