//! Tail configuration
//!
//! Tuning for the watcher/reader loop and the per-viewer delivery queues,
//! plus the set of log files exposed under `/debug/log/{name}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default access log path
pub const DEFAULT_HTTPLOG_PATH: &str = "/var/log/nginx/access.log";

/// Default slow query log path
pub const DEFAULT_SLOWLOG_PATH: &str = "/var/log/mysql/mysql-slow.log";

/// Tail tuning
///
/// ```toml
/// [tail]
/// poll_interval = "250ms"
/// queue_capacity = 256
/// max_subscribers = 100
/// max_chunk_bytes = 65536
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// How often the watcher stats the file. Filesystem notifications wake
    /// it earlier when available.
    /// Default: 250ms
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Chunks buffered per viewer before it is disconnected as too slow
    /// Default: 256
    pub queue_capacity: usize,

    /// Concurrent viewers allowed per log file
    /// Default: 100
    pub max_subscribers: usize,

    /// Upper bound on the payload of a single chunk
    /// Default: 65536 (64KB)
    pub max_chunk_bytes: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            queue_capacity: 256,
            max_subscribers: 100,
            max_chunk_bytes: 64 * 1024,
        }
    }
}

/// One tailed file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogFileConfig {
    /// File path; a leading `~/` expands to the home directory
    pub path: PathBuf,
}

impl LogFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path with `~/` expanded
    pub fn resolved_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

/// Named log files
///
/// Declaring any `[logs.<name>]` table replaces the defaults entirely.
///
/// ```toml
/// [logs.httplog]
/// path = "/var/log/nginx/access.log"
///
/// [logs.app]
/// path = "~/app/current.log"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LogsConfig {
    pub files: BTreeMap<String, LogFileConfig>,
}

impl Default for LogsConfig {
    fn default() -> Self {
        let mut files = BTreeMap::new();
        files.insert("httplog".into(), LogFileConfig::new(DEFAULT_HTTPLOG_PATH));
        files.insert("slowlog".into(), LogFileConfig::new(DEFAULT_SLOWLOG_PATH));
        Self { files }
    }
}

impl LogsConfig {
    /// Look up a log by name
    pub fn get(&self, name: &str) -> Option<&LogFileConfig> {
        self.files.get(name)
    }

    /// Set (or add) the path of a named log
    pub fn set_path(&mut self, name: &str, path: impl Into<PathBuf>) {
        self.files.insert(name.to_string(), LogFileConfig::new(path));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LogFileConfig)> {
        self.files.iter().map(|(name, file)| (name.as_str(), file))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Expand ~ to home directory
pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    path.to_str()
        .and_then(|s| s.strip_prefix("~/"))
        .and_then(|stripped| dirs::home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tail_config() {
        let config = TailConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.max_subscribers, 100);
        assert_eq!(config.max_chunk_bytes, 64 * 1024);
    }

    #[test]
    fn test_deserialize_tail_partial() {
        let toml = r#"
poll_interval = "1s"
queue_capacity = 16
"#;
        let config: TailConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.max_subscribers, 100);
    }

    #[test]
    fn test_default_logs() {
        let logs = LogsConfig::default();
        assert_eq!(logs.len(), 2);
        assert_eq!(
            logs.get("httplog").unwrap().path,
            PathBuf::from(DEFAULT_HTTPLOG_PATH)
        );
        assert_eq!(
            logs.get("slowlog").unwrap().path,
            PathBuf::from(DEFAULT_SLOWLOG_PATH)
        );
    }

    #[test]
    fn test_set_path_adds_and_replaces() {
        let mut logs = LogsConfig::default();
        logs.set_path("httplog", "/tmp/access.log");
        logs.set_path("app", "/tmp/app.log");

        assert_eq!(logs.len(), 3);
        assert_eq!(logs.get("httplog").unwrap().path, PathBuf::from("/tmp/access.log"));
        assert_eq!(logs.get("app").unwrap().path, PathBuf::from("/tmp/app.log"));
    }

    #[test]
    fn test_expand_tilde() {
        let file = LogFileConfig::new("~/logs/app.log");
        let resolved = file.resolved_path();
        assert!(!resolved.to_str().unwrap().starts_with('~'));
        assert!(resolved.ends_with("logs/app.log"));
    }

    #[test]
    fn test_absolute_path_untouched() {
        let file = LogFileConfig::new("/var/log/app.log");
        assert_eq!(file.resolved_path(), PathBuf::from("/var/log/app.log"));
    }
}
