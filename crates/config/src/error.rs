//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "log", "revision")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// An environment override carried a value that doesn't parse
    #[error("environment variable {var} has invalid value '{value}'")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// The rejected value
        value: String,
    },

    /// Nothing to tail
    #[error("no logs are configured - at least one [logs.<name>] entry is required")]
    NoLogsConfigured,
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("log", "httplog", "path");
        assert!(err.to_string().contains("log"));
        assert!(err.to_string().contains("httplog"));
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("tail", "tail", "queue_capacity", "must be > 0");
        assert!(err.to_string().contains("queue_capacity"));
        assert!(err.to_string().contains("must be > 0"));
    }

    #[test]
    fn test_invalid_env_error() {
        let err = ConfigError::InvalidEnv {
            var: "PORT",
            value: "http".into(),
        };
        assert!(err.to_string().contains("PORT"));
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_no_logs_configured() {
        let err = ConfigError::NoLogsConfigured;
        assert!(err.to_string().contains("no logs"));
    }
}
