pub mod close;
pub mod daily;
pub mod download;
pub mod list;
pub mod size;

use anyhow::{Context, Result};
use fx_strategies::Config;

/// Load the config file, naming the path on failure
pub fn load_config(path: &str) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config from {}", path))
}
