//! Daemon configuration loading

use anyhow::{Context, Result};
use housekeeper_lib::HousekeeperConfig;
use std::path::PathBuf;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "HOUSEKEEPER_CONFIG";

/// Load configuration from `HOUSEKEEPER_CONFIG`, else `./housekeeper.toml` if
/// present, then apply environment overrides
pub fn load() -> Result<HousekeeperConfig> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let path = HousekeeperConfig::resolve_path(explicit);

    HousekeeperConfig::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })
}
