//! Initialize a settings file from the bundled template (`crates/lib/config/settings.json`).

use anyhow::{Context, Result};
use std::path::Path;

static SETTINGS_TEMPLATE: &str = include_str!("../config/settings.json");

/// Write the template to `config_path` unless a file is already there.
/// Creates the parent directory. Returns true when a file was written.
pub fn init_settings_file(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        log::info!("settings file already exists at {}, skipping", config_path.display());
        return Ok(false);
    }
    let dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating settings directory {}", dir.display()))?;
    std::fs::write(config_path, SETTINGS_TEMPLATE)
        .with_context(|| format!("writing settings template to {}", config_path.display()))?;
    log::info!("created settings template at {}", config_path.display());
    Ok(true)
}
