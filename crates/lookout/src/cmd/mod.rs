//! Command implementations for the Lookout CLI

pub mod config;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lookout_config::Config;
use tracing::info;

/// Config files tried, in order, when `--config` is not given
const DEFAULT_CONFIG_PATHS: &[&str] = &["lookout.toml", "configs/lookout.toml"];

/// Load configuration from `path`, or the first default path that exists,
/// or built-in defaults. Environment overrides are not applied here.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        // User explicitly provided config path - must exist
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path).context("failed to load configuration");
    }

    for candidate in DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from) {
        if candidate.exists() {
            info!(config = %candidate.display(), "using config file");
            return Config::from_file(&candidate).context("failed to load configuration");
        }
    }

    Ok(Config::default())
}
