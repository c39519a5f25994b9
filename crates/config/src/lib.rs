//! Lookout Configuration
//!
//! TOML-based configuration with sensible defaults. An empty file (or no file
//! at all) tails the nginx access log and the MySQL slow log and serves them
//! on port 19000.
//!
//! # Parsing
//!
//! ```
//! use lookout_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[logs.app]\npath = \"/var/log/app.log\"").unwrap();
//! assert!(config.logs.get("app").is_some());
//! ```
//!
//! # Environment
//!
//! [`Config::apply_env`] folds `LOOKOUT_HTTPLOG`, `LOOKOUT_SLOWLOG`,
//! `LOOKOUT_GIT_REPOSITORY` and `PORT` into the loaded value. Callers that
//! need isolation (tests) use [`Config::apply_env_with`] instead.
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [server]
//! port = 19000
//!
//! [tail]
//! poll_interval = "250ms"
//! queue_capacity = 256
//!
//! [logs.httplog]
//! path = "/var/log/nginx/access.log"
//!
//! [revision]
//! repository = "/srv/app"
//! ```

mod env;
mod error;
mod logging;
mod revision;
mod server;
mod tail;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use env::{ENV_GIT_REPOSITORY, ENV_HTTPLOG, ENV_PORT, ENV_SLOWLOG};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use revision::RevisionConfig;
pub use server::{DEFAULT_PORT, ServerConfig};
pub use tail::{
    DEFAULT_HTTPLOG_PATH, DEFAULT_SLOWLOG_PATH, LogFileConfig, LogsConfig, TailConfig,
};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// HTTP listener
    pub server: ServerConfig,

    /// Watcher/reader and delivery tuning
    pub tail: TailConfig,

    /// Tailed files by route name
    pub logs: LogsConfig,

    /// Revision header settings
    pub revision: RevisionConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        env::apply(self, lookup)?;
        self.validate()
    }

    /// Names of configured logs, sorted
    pub fn log_names(&self) -> Vec<&str> {
        self.logs.iter().map(|(name, _)| name).collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
