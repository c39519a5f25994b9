//! Revision lookup by running `git`

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::RevisionProvider;
use crate::error::{Result, RevisionError};
use crate::info::RevisionInfo;

/// Default bound on one lookup
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// `log -1` format: hash, author, committer date, subject (NUL separated)
const LOG_FORMAT: &str = "--format=%H%x00%an%x00%cI%x00%s";

/// Reads HEAD metadata with the `git` executable
#[derive(Debug, Clone)]
pub struct GitRevisionProvider {
    program: String,
    timeout: Duration,
}

impl GitRevisionProvider {
    pub fn new() -> Self {
        Self {
            program: "git".into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Kill the lookup after `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different executable (for a non-PATH git)
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn lookup(&self, repo: &Path) -> Result<RevisionInfo> {
        let log = self.git(repo, "log", &["log", "-1", LOG_FORMAT]).await?;
        let mut info = parse_log(&log)?;

        info.branch = self
            .git(repo, "rev-parse", &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .ok()
            .and_then(|out| parse_branch(&out));

        // Exit status 1 just means no origin remote
        info.repository = self
            .git(repo, "config", &["config", "--get", "remote.origin.url"])
            .await
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(info)
    }

    async fn git(&self, repo: &Path, command: &'static str, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(repo)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(RevisionError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|_| RevisionError::InvalidOutput(format!("git {command}: output is not UTF-8")))
    }
}

impl Default for GitRevisionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevisionProvider for GitRevisionProvider {
    async fn revision(&self, repo: &Path) -> Result<RevisionInfo> {
        debug!(repo = %repo.display(), "looking up revision");
        tokio::time::timeout(self.timeout, self.lookup(repo))
            .await
            .map_err(|_| RevisionError::Timeout(self.timeout))?
    }

    fn name(&self) -> &'static str {
        "git"
    }
}

/// Parse the `log -1` line produced with [`LOG_FORMAT`]
pub(crate) fn parse_log(output: &str) -> Result<RevisionInfo> {
    let line = output.trim_end_matches(['\n', '\r']);
    let mut fields = line.splitn(4, '\0');

    let mut next = |name: &str| {
        fields
            .next()
            .map(str::to_string)
            .ok_or_else(|| RevisionError::InvalidOutput(format!("log output missing {name}")))
    };

    let hash = next("hash")?;
    let author = next("author")?;
    let committed_at = next("date")?;
    let message = next("subject")?;

    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RevisionError::InvalidOutput(format!("bad commit hash {hash:?}")));
    }

    Ok(RevisionInfo {
        repository: None,
        branch: None,
        hash,
        author,
        committed_at,
        message,
    })
}

/// `rev-parse --abbrev-ref HEAD` prints `HEAD` when detached
pub(crate) fn parse_branch(output: &str) -> Option<String> {
    let branch = output.trim();
    (!branch.is_empty() && branch != "HEAD").then(|| branch.to_string())
}

#[cfg(test)]
#[path = "git_test.rs"]
mod tests;
