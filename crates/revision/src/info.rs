//! Revision metadata

use serde::Serialize;

/// Commit the served code was built from, as reported by the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionInfo {
    /// Remote URL of `origin`, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Checked-out branch; absent on a detached HEAD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Full commit hash
    pub hash: String,
    pub author: String,
    /// Committer date, ISO 8601
    pub committed_at: String,
    /// Commit subject line
    pub message: String,
}

impl RevisionInfo {
    /// Compact JSON, suitable for a header value
    pub fn to_json(&self) -> String {
        // Plain strings only; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// First 12 hex digits of the hash
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(12);
        &self.hash[..end]
    }
}
