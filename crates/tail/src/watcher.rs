//! File watcher
//!
//! `FileWatcher` turns a path into an endless sequence of [`WatchEvent`]s.
//! It stats the path on a fixed cadence and compares the result against the
//! last observation:
//!
//! - same identity, different size → `Grew` (a smaller size is reported too;
//!   the reader treats it as truncation)
//! - different identity → `Rotated`
//! - stat failure → `Error`, once per outage; polling continues
//!
//! Filesystem notifications (via `notify`) on the parent directory wake the
//! watcher early so viewers see appends with low latency. The poll keeps
//! running regardless, because notifications can be missed or unavailable.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

/// Stable identity of an open file: (device, inode) on Unix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    pub fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    #[cfg(unix)]
    pub fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::new(meta.dev(), meta.ino())
    }

    /// Without inodes the creation time is the best stand-in
    #[cfg(not(unix))]
    pub fn from_metadata(meta: &Metadata) -> Self {
        let created = meta
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(0, created)
    }
}

/// What changed at the watched path
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Size changed while the identity stayed the same
    Grew { size: u64 },
    /// A different file now lives at the path
    Rotated { identity: FileIdentity, size: u64 },
    /// The path could not be inspected
    Error(Arc<io::Error>),
}

/// Last observed (identity, size)
pub type Position = (FileIdentity, u64);

/// Polling watcher for a single path
pub struct FileWatcher {
    path: PathBuf,
    ticker: Interval,
    wake_rx: mpsc::Receiver<()>,
    // Dropping the notify watcher stops its background thread
    _notify: Option<RecommendedWatcher>,
    last: Option<Position>,
    failing: bool,
}

impl FileWatcher {
    /// Create a watcher. Must be called inside a tokio runtime.
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        let path = path.into();

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (wake_tx, wake_rx) = mpsc::channel(1);
        let notify = setup_notify_watcher(&path, wake_tx);
        if notify.is_none() {
            debug!(path = %path.display(), "filesystem notifications unavailable, polling only");
        }

        Self {
            path,
            ticker,
            wake_rx,
            _notify: notify,
            last: None,
            failing: false,
        }
    }

    /// Start from a known position instead of treating the first successful
    /// stat as a rotation
    pub fn with_baseline(mut self, baseline: Option<Position>) -> Self {
        self.last = baseline;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change. Never returns while nothing changes.
    pub async fn next_event(&mut self) -> WatchEvent {
        loop {
            tokio::select! {
                _ = self.ticker.tick() => {}
                Some(()) = self.wake_rx.recv() => {}
            }

            let stat = tokio::fs::metadata(&self.path).await;
            if let Some(event) = self.observe(stat) {
                return event;
            }
        }
    }

    /// Consume the watcher into an infinite stream of events
    pub fn into_stream(self) -> impl Stream<Item = WatchEvent> + Send {
        futures_util::stream::unfold(self, |mut watcher| async move {
            let event = watcher.next_event().await;
            Some((event, watcher))
        })
    }

    /// Fold one stat result into the watcher state
    pub(crate) fn observe(&mut self, stat: io::Result<Metadata>) -> Option<WatchEvent> {
        let meta = match stat {
            Ok(meta) => meta,
            Err(e) => {
                if self.failing {
                    return None;
                }
                self.failing = true;
                return Some(WatchEvent::Error(Arc::new(e)));
            }
        };

        self.failing = false;
        let identity = FileIdentity::from_metadata(&meta);
        let size = meta.len();

        match self.last.replace((identity, size)) {
            Some((last_identity, last_size)) if last_identity == identity => {
                (size != last_size).then_some(WatchEvent::Grew { size })
            }
            _ => Some(WatchEvent::Rotated { identity, size }),
        }
    }
}

/// Watch the parent directory so creation of a replacement file is seen too
fn setup_notify_watcher(path: &Path, wake_tx: mpsc::Sender<()>) -> Option<RecommendedWatcher> {
    let file_name = path.file_name()?.to_owned();
    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
        {
            let _ = wake_tx.try_send(());
        }
    })
    .ok()?;

    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .ok()?;

    Some(watcher)
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod tests;
