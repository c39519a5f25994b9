//! Error types for the tail crate

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while tailing
#[derive(Error, Debug)]
pub enum TailError {
    /// I/O error on the tailed file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Maximum subscribers reached for one file
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// The broadcaster was shut down and accepts no new subscribers
    #[error("log stream has been shut down")]
    Closed,
}

impl TailError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is the "file not there (yet)" kind that the watcher
    /// retries on its normal cadence
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io { source, .. } => is_transient_io(source),
            _ => false,
        }
    }
}

/// Missing and permission-denied files are expected around rotation
pub(crate) fn is_transient_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

/// Result type for tail operations
pub type Result<T> = std::result::Result<T, TailError>;
