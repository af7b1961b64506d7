//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;
pub mod serve;
pub mod text;

use tracing::debug;

use invoscan_core::ScanConfig;

/// Load the file given with `--config`, else the default file if it exists,
/// else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ScanConfig> {
    match config::config_source(config_path) {
        Some(path) => {
            debug!("Using configuration from {}", path.display());
            ScanConfig::from_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))
        }
        None => Ok(ScanConfig::default()),
    }
}
