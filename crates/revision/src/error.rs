//! Error types for revision lookup

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while looking up revision metadata
///
/// Cloneable so a failed lookup can be cached like a successful one.
#[derive(Error, Debug, Clone)]
pub enum RevisionError {
    /// `git` could not be started
    #[error("failed to run git: {0}")]
    Spawn(#[source] Arc<io::Error>),

    /// `git` ran but exited unsuccessfully
    #[error("git {command} failed ({status}): {stderr}")]
    CommandFailed {
        command: &'static str,
        status: String,
        stderr: String,
    },

    /// `git` printed something we could not interpret
    #[error("unexpected git output: {0}")]
    InvalidOutput(String),

    /// The lookup took longer than allowed
    #[error("revision lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl From<io::Error> for RevisionError {
    fn from(err: io::Error) -> Self {
        Self::Spawn(Arc::new(err))
    }
}

/// Result type for revision operations
pub type Result<T> = std::result::Result<T, RevisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = RevisionError::CommandFailed {
            command: "log",
            status: "exit status: 128".into(),
            stderr: "fatal: not a git repository".into(),
        };
        assert_eq!(
            err.to_string(),
            "git log failed (exit status: 128): fatal: not a git repository"
        );
    }

    #[test]
    fn test_io_error_converts_to_spawn() {
        let err: RevisionError = io::Error::from(io::ErrorKind::NotFound).into();
        assert!(matches!(err, RevisionError::Spawn(_)));
        assert!(err.clone().to_string().starts_with("failed to run git"));
    }
}
