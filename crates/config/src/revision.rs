//! Revision lookup configuration
//!
//! Controls the `X-Git-Repository` response header.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::tail::expand_tilde;

/// Revision lookup configuration
///
/// ```toml
/// [revision]
/// enabled = true
/// repository = "/srv/app"
/// timeout = "2s"
/// cache_ttl = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RevisionConfig {
    /// Attach the revision header to debug responses
    /// Default: true
    pub enabled: bool,

    /// Repository to describe
    /// Default: "." (working directory)
    pub repository: PathBuf,

    /// Upper bound on one lookup; on expiry the header is omitted
    /// Default: 2s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// How long a successful lookup is reused
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repository: PathBuf::from("."),
            timeout: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(5),
        }
    }
}

impl RevisionConfig {
    /// Repository path with `~/` expanded
    pub fn repository_path(&self) -> PathBuf {
        expand_tilde(&self.repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RevisionConfig::default();
        assert!(config.enabled);
        assert_eq!(config.repository, PathBuf::from("."));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
enabled = false
repository = "/srv/app"
timeout = "500ms"
cache_ttl = "1m"
"#;
        let config: RevisionConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.repository_path(), PathBuf::from("/srv/app"));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }
}
