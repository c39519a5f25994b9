//! Configuration validation
//!
//! Checks:
//! - At least one log is configured
//! - Log names are usable as a single URL path segment
//! - Log paths are non-empty
//! - Tail tuning values are non-zero

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_logs(config)?;
    validate_tail(config)?;
    Ok(())
}

fn validate_logs(config: &Config) -> Result<()> {
    if config.logs.is_empty() {
        return Err(ConfigError::NoLogsConfigured);
    }

    for (name, file) in config.logs.iter() {
        if !is_valid_log_name(name) {
            return Err(ConfigError::invalid_value(
                "log",
                name,
                "name",
                "only ASCII letters, digits, '-' and '_' are allowed",
            ));
        }
        if file.path.as_os_str().is_empty() {
            return Err(ConfigError::missing_field("log", name, "path"));
        }
    }

    Ok(())
}

fn validate_tail(config: &Config) -> Result<()> {
    let tail = &config.tail;

    if tail.poll_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "tail",
            "tail",
            "poll_interval",
            "must be greater than zero",
        ));
    }
    if tail.queue_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "tail",
            "tail",
            "queue_capacity",
            "must be greater than zero",
        ));
    }
    if tail.max_subscribers == 0 {
        return Err(ConfigError::invalid_value(
            "tail",
            "tail",
            "max_subscribers",
            "must be greater than zero",
        ));
    }
    if tail.max_chunk_bytes == 0 {
        return Err(ConfigError::invalid_value(
            "tail",
            "tail",
            "max_chunk_bytes",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn is_valid_log_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
