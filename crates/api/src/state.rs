//! Application state
//!
//! Shared state for the debug handlers: the running tail points and the
//! optional revision source used by the header layer.

use std::sync::Arc;
use std::time::Instant;

use lookout_tail::TailRegistry;

use crate::revision::RevisionSource;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Running tail points, by log name
    pub tails: Arc<TailRegistry>,
    /// Where `X-Git-Repository` comes from; `None` disables the header
    pub revision: Option<Arc<RevisionSource>>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(tails: Arc<TailRegistry>) -> Self {
        Self {
            tails,
            revision: None,
            start_time: Instant::now(),
        }
    }

    /// Attach revision metadata to debug responses
    pub fn with_revision(mut self, revision: RevisionSource) -> Self {
        self.revision = Some(Arc::new(revision));
        self
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
