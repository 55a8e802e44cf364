//! Configuration discovery for the CLI

use anyhow::{Context, Result};
use housekeeper_lib::HousekeeperConfig;
use std::path::PathBuf;

/// Per-user configuration file: `~/.config/housekeeper/housekeeper.toml`
pub fn user_config_path() -> Option<PathBuf> {
    let home = dirs_next::home_dir()?;
    Some(home.join(".config").join("housekeeper").join("housekeeper.toml"))
}

/// Pick the configuration file: `--config`, then the per-user file, then
/// `./housekeeper.toml`. `None` means defaults plus environment overrides.
pub fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .or_else(|| user_config_path().filter(|p| p.is_file()))
        .or_else(|| HousekeeperConfig::resolve_path(None))
}

pub fn load(explicit: Option<PathBuf>) -> Result<HousekeeperConfig> {
    let path = config_path(explicit);

    HousekeeperConfig::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Invalid configuration in {}", path.display()),
        None => "Invalid configuration from environment".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/etc/housekeeper/custom.toml");

        assert_eq!(config_path(Some(explicit.clone())), Some(explicit));
    }

    #[test]
    fn test_user_config_path_layout() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with(".config/housekeeper/housekeeper.toml"));
        }
    }
}
