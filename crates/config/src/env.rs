//! Environment overrides
//!
//! Read once at startup and folded into the [`Config`] value, so nothing
//! downstream consults the environment.

use crate::Config;
use crate::error::{ConfigError, Result};

/// Overrides the `httplog` path
pub const ENV_HTTPLOG: &str = "LOOKOUT_HTTPLOG";

/// Overrides the `slowlog` path
pub const ENV_SLOWLOG: &str = "LOOKOUT_SLOWLOG";

/// Overrides the revision repository path
pub const ENV_GIT_REPOSITORY: &str = "LOOKOUT_GIT_REPOSITORY";

/// Overrides the listen port
pub const ENV_PORT: &str = "PORT";

/// Apply overrides using `lookup` as the variable source.
///
/// Empty values count as unset.
pub(crate) fn apply<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(path) = get(ENV_HTTPLOG) {
        config.logs.set_path("httplog", path);
    }
    if let Some(path) = get(ENV_SLOWLOG) {
        config.logs.set_path("slowlog", path);
    }
    if let Some(repo) = get(ENV_GIT_REPOSITORY) {
        config.revision.repository = repo.into();
    }
    if let Some(port) = get(ENV_PORT) {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            var: ENV_PORT,
            value: port.clone(),
        })?;
    }

    Ok(())
}
