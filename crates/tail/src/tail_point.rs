//! TailPoint - one running tail of one log file
//!
//! A `TailPoint` owns the task that drives a [`FileWatcher`] and a
//! [`TailReader`] and publishes chunks into its [`Broadcaster`]. The task is
//! the only writer of the read offset and file handle.
//!
//! - No subscribers: events only move the offset forward (no reads)
//! - Read failure on an open handle: every session ends with
//!   `CLOSED_BY_FILE_ERROR`, the handle is reopened on the next event
//! - Cancellation: every session ends with `CLOSED_BY_SERVER(shutdown)`
//!
//! # Usage
//!
//! ```ignore
//! let (tail, task) = TailPoint::spawn("httplog", "/var/log/nginx/access.log",
//!     TailOptions::default(), cancel.child_token());
//!
//! let session = tail.open_session()?;   // hand to the response body
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::broadcaster::{Broadcaster, DEFAULT_MAX_SUBSCRIBERS, DEFAULT_QUEUE_CAPACITY};
use crate::chunk::LogChunk;
use crate::error::{Result, TailError};
use crate::reader::TailReader;
use crate::session::StreamSession;
use crate::stats::{TailStats, TailStatsSnapshot};
use crate::subscriber::{Subscriber, Termination};
use crate::watcher::{FileWatcher, WatchEvent};

/// Default stat cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default upper bound for one chunk
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 64 * 1024;

/// Tuning for a tail point
#[derive(Debug, Clone, Copy)]
pub struct TailOptions {
    pub poll_interval: Duration,
    pub queue_capacity: usize,
    pub max_subscribers: usize,
    pub max_chunk_bytes: usize,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }
}

/// A named, running tail of one file
#[derive(Debug)]
pub struct TailPoint {
    name: Arc<str>,
    path: PathBuf,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<TailStats>,
    cancel: CancellationToken,
}

impl TailPoint {
    /// Start tailing `path`. Must be called inside a tokio runtime.
    ///
    /// The returned task finishes after `cancel` fires.
    pub fn spawn(
        name: impl Into<Arc<str>>,
        path: impl Into<PathBuf>,
        options: TailOptions,
        cancel: CancellationToken,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let tail = Arc::new(Self {
            name: name.into(),
            path: path.into(),
            broadcaster: Arc::new(Broadcaster::new(
                options.queue_capacity,
                options.max_subscribers,
            )),
            stats: Arc::new(TailStats::new()),
            cancel,
        });

        let task = tokio::spawn(Arc::clone(&tail).run(options));
        (tail, task)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a viewer
    pub fn subscribe(&self) -> Result<Subscriber> {
        if self.cancel.is_cancelled() {
            return Err(TailError::Closed);
        }
        self.broadcaster.subscribe()
    }

    /// Register a viewer and wrap it in a streamable session
    pub fn open_session(&self) -> Result<StreamSession> {
        let subscriber = self.subscribe()?;
        Ok(StreamSession::new(Arc::clone(&self.name), subscriber))
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    pub fn stats(&self) -> TailStatsSnapshot {
        self.stats.snapshot()
    }

    /// Subscriber limit of this log
    pub fn max_subscribers(&self) -> usize {
        self.broadcaster.max_subscribers()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    async fn run(self: Arc<Self>, options: TailOptions) {
        let mut reader =
            TailReader::open(&self.path, options.max_chunk_bytes, Arc::clone(&self.stats)).await;
        let events = FileWatcher::new(&self.path, options.poll_interval)
            .with_baseline(reader.position())
            .into_stream();
        tokio::pin!(events);

        info!(
            log = %self.name,
            path = %self.path.display(),
            offset = reader.offset(),
            open = reader.is_open(),
            "tailing log"
        );

        let mut unavailable = false;
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.next() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match &event {
                WatchEvent::Error(e) => {
                    unavailable = true;
                    warn!(log = %self.name, path = %self.path.display(), error = %e, "log unavailable");
                    continue;
                }
                _ if unavailable => {
                    unavailable = false;
                    info!(log = %self.name, path = %self.path.display(), "log available again");
                }
                _ => {}
            }

            if self.broadcaster.has_subscribers() {
                if let Err(e) = self.deliver(&mut reader, &event).await {
                    self.handle_read_error(e);
                }
            } else if let Err(e) = reader.skip(&event).await {
                trace!(log = %self.name, error = %e, "skip failed while idle");
            }
        }

        let closed = self.broadcaster.close();
        info!(log = %self.name, sessions = closed, "tail stopped");
    }

    /// Read everything the event made available and publish it
    async fn deliver(&self, reader: &mut TailReader, event: &WatchEvent) -> Result<()> {
        let mut next = reader.read(event).await?;
        while let Some(chunk) = next {
            self.publish(chunk);
            if !reader.is_behind() {
                break;
            }
            // Let sessions drain between chunks of a large backlog
            tokio::task::yield_now().await;
            next = reader.read_pending().await?;
        }
        Ok(())
    }

    fn publish(&self, chunk: LogChunk) {
        let seq = chunk.seq();
        let report = self.broadcaster.publish(Arc::new(chunk));
        self.stats.record_delivered(report.delivered);
        if report.disconnected > 0 {
            self.stats.record_slow_disconnects(report.disconnected);
        }
        trace!(log = %self.name, seq, delivered = report.delivered, "published chunk");
    }

    fn handle_read_error(&self, err: TailError) {
        if err.is_transient() {
            // Disappeared between stat and open; the watcher reports it
            debug!(log = %self.name, error = %err, "log not readable, waiting");
            return;
        }

        let ended = self.broadcaster.terminate_all(Termination::FileError);
        warn!(log = %self.name, error = %err, sessions = ended, "read failed, ending sessions");
    }
}

#[cfg(test)]
#[path = "tail_point_test.rs"]
mod tests;
