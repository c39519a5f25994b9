//! Lookout Revision - which commit is this process serving?
//!
//! Debug responses carry the repository's HEAD metadata so a captured log
//! stream or profile can be matched to a deploy. Lookups go through the
//! [`RevisionProvider`] trait:
//!
//! - [`GitRevisionProvider`] runs `git` with a timeout
//! - [`CachedRevisionProvider`] reuses answers for a short TTL
//!
//! A failed lookup is never fatal to the caller; it only means the metadata
//! is left out.

use std::path::Path;

use async_trait::async_trait;

mod cache;
mod error;
mod git;
mod info;

pub use cache::{CachedRevisionProvider, DEFAULT_CACHE_TTL};
pub use error::{Result, RevisionError};
pub use git::{DEFAULT_TIMEOUT, GitRevisionProvider};
pub use info::RevisionInfo;

/// Source of revision metadata for a repository path
#[async_trait]
pub trait RevisionProvider: Send + Sync {
    /// Look up HEAD of the repository at `repo`
    async fn revision(&self, repo: &Path) -> Result<RevisionInfo>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
