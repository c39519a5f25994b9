//! Time-bounded cache in front of a revision provider
//!
//! Revision metadata changes only on deploy, but the header is attached to
//! every debug response. Lookups (including failures) are kept for `ttl`
//! per repository path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use crate::RevisionProvider;
use crate::error::Result;
use crate::info::RevisionInfo;

/// Default time a lookup is reused
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct CacheEntry {
    fetched_at: Instant,
    result: Result<RevisionInfo>,
}

/// Wraps a provider and reuses its answers for a while
#[derive(Debug)]
pub struct CachedRevisionProvider<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl<P: RevisionProvider> CachedRevisionProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn cached(&self, repo: &Path) -> Option<Result<RevisionInfo>> {
        let entries = self.entries.lock();
        let entry = entries.get(repo)?;
        (entry.fetched_at.elapsed() < self.ttl).then(|| entry.result.clone())
    }
}

#[async_trait]
impl<P: RevisionProvider> RevisionProvider for CachedRevisionProvider<P> {
    async fn revision(&self, repo: &Path) -> Result<RevisionInfo> {
        if let Some(result) = self.cached(repo) {
            trace!(repo = %repo.display(), "revision cache hit");
            return result;
        }

        // Lock is not held across the lookup; concurrent misses may both fetch
        let result = self.inner.revision(repo).await;
        self.entries.lock().insert(
            repo.to_path_buf(),
            CacheEntry {
                fetched_at: Instant::now(),
                result: result.clone(),
            },
        );
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
