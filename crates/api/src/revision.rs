//! Revision header middleware
//!
//! Adds `X-Git-Repository: <json>` to every debug response. The lookup runs
//! alongside the handler and is bounded by a timeout; when it fails or runs
//! late the header is simply left out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{trace, warn};

use lookout_revision::RevisionProvider;

use crate::state::AppState;

/// Response header carrying revision metadata
pub const X_GIT_REPOSITORY: &str = "x-git-repository";

/// A provider bound to one repository path
pub struct RevisionSource {
    provider: Arc<dyn RevisionProvider>,
    repository: PathBuf,
    timeout: Duration,
}

impl RevisionSource {
    pub fn new(
        provider: Arc<dyn RevisionProvider>,
        repository: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            repository: repository.into(),
            timeout,
        }
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Look up the header value; `None` on any failure
    pub async fn header_value(&self) -> Option<HeaderValue> {
        let lookup = self.provider.revision(&self.repository);
        let info = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                warn!(
                    provider = self.provider.name(),
                    repo = %self.repository.display(),
                    error = %e,
                    "failed to get revision info"
                );
                return None;
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    repo = %self.repository.display(),
                    timeout = ?self.timeout,
                    "revision lookup timed out"
                );
                return None;
            }
        };

        trace!(revision = info.short_hash(), "attaching revision header");

        // JSON escapes control characters; non-ASCII passes as opaque bytes
        match HeaderValue::from_bytes(info.to_json().as_bytes()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "revision info is not a valid header value");
                None
            }
        }
    }
}

impl std::fmt::Debug for RevisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionSource")
            .field("provider", &self.provider.name())
            .field("repository", &self.repository)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Middleware: decorate the response with revision metadata
pub async fn revision_header(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(source) = state.revision.clone() else {
        return next.run(request).await;
    };

    let (value, mut response) = tokio::join!(source.header_value(), next.run(request));
    if let Some(value) = value {
        response.headers_mut().insert(X_GIT_REPOSITORY, value);
    }
    response
}
