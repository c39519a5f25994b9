//! Tail reader
//!
//! `TailReader` owns the open handle and read offset of one tracked file and
//! turns [`WatchEvent`]s into [`LogChunk`]s. It is driven by a single task,
//! so offset and handle are never shared.
//!
//! Offset rules:
//! - growth: read `[offset, size)` in chunks of at most `max_chunk` bytes
//! - rotation: reopen the path, offset back to 0, read the new file from its
//!   start (everything in it was written after the rotation)
//! - truncation (size < offset, same identity): offset back to 0

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use crate::chunk::LogChunk;
use crate::error::{Result, TailError};
use crate::stats::TailStats;
use crate::watcher::{FileIdentity, Position, WatchEvent};

/// Reads newly appended bytes of one file
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,
    file: Option<File>,
    identity: Option<FileIdentity>,
    /// Next byte to read
    offset: u64,
    /// File size as last reported by the watcher
    target: u64,
    next_seq: u64,
    max_chunk: usize,
    stats: Arc<TailStats>,
}

impl TailReader {
    /// Open `path` positioned at its current end.
    ///
    /// A missing or unreadable file is not an error; the reader starts
    /// detached and attaches on the first watcher event that finds it.
    pub async fn open(path: impl Into<PathBuf>, max_chunk: usize, stats: Arc<TailStats>) -> Self {
        let mut reader = Self {
            path: path.into(),
            file: None,
            identity: None,
            offset: 0,
            target: 0,
            next_seq: 1,
            max_chunk: max_chunk.max(1),
            stats,
        };

        match reader.open_handle().await {
            Ok(len) => {
                reader.offset = len;
                reader.target = len;
            }
            Err(e) => {
                debug!(error = %e, "log not readable yet");
                reader.remember_end().await;
            }
        }

        reader
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next byte to be read
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Whether bytes up to the last reported size remain unread
    #[inline]
    pub fn is_behind(&self) -> bool {
        self.file.is_some() && self.offset < self.target
    }

    /// Identity and size of the followed file, for seeding the watcher.
    ///
    /// Also known for a file that exists but could not be opened yet.
    pub fn position(&self) -> Option<Position> {
        self.identity.map(|identity| (identity, self.target))
    }

    /// Apply an event and read the first chunk it made available.
    ///
    /// Call [`read_pending`](Self::read_pending) while
    /// [`is_behind`](Self::is_behind) to drain the rest.
    pub async fn read(&mut self, event: &WatchEvent) -> Result<Option<LogChunk>> {
        self.apply(event).await?;
        self.read_pending().await
    }

    /// Apply an event without reading: the offset jumps to the new end.
    ///
    /// Used while nobody is subscribed so a later viewer starts from "now".
    pub async fn skip(&mut self, event: &WatchEvent) -> Result<()> {
        self.apply(event).await?;
        self.offset = self.target;
        Ok(())
    }

    /// Read the next chunk towards the last reported size
    pub async fn read_pending(&mut self) -> Result<Option<LogChunk>> {
        if self.offset >= self.target {
            return Ok(None);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        let want = (self.target - self.offset).min(self.max_chunk as u64) as usize;
        let data = match read_at(file, self.offset, want).await {
            Ok(data) => data,
            Err(e) => {
                // Reattach on the next event rather than keep a broken handle
                self.file = None;
                return Err(TailError::io(&self.path, e));
            }
        };

        if data.len() < want {
            // Shrunk underneath us; the watcher will report the new size
            self.target = self.offset + data.len() as u64;
        }
        if data.is_empty() {
            return Ok(None);
        }

        let chunk = LogChunk::new(self.next_seq, self.offset, data.freeze());
        self.next_seq += 1;
        self.offset = chunk.end();
        self.stats.record_read(chunk.len());

        Ok(Some(chunk))
    }

    async fn apply(&mut self, event: &WatchEvent) -> Result<()> {
        match event {
            WatchEvent::Grew { size } => {
                if self.file.is_none() {
                    self.reattach().await?;
                }
                if *size < self.offset {
                    info!(
                        path = %self.path.display(),
                        offset = self.offset,
                        size,
                        "log truncated, restarting from the beginning"
                    );
                    self.stats.record_truncation();
                    self.offset = 0;
                }
                self.target = *size;
            }
            WatchEvent::Rotated { identity, size } => {
                if self.identity == Some(*identity) {
                    // Already following this file (reopened ahead of the watcher)
                    if self.file.is_none() {
                        self.reattach().await?;
                    }
                    self.target = (*size).max(self.offset);
                    return Ok(());
                }

                self.identity = None;
                self.offset = 0;
                self.target = 0;
                let len = self.open_handle().await?;
                self.target = len;
                self.stats.record_rotation();
                info!(path = %self.path.display(), size = len, "log rotated, following new file");
            }
            WatchEvent::Error(_) => {}
        }
        Ok(())
    }

    /// Position at the end of a file that exists but cannot be opened, so
    /// opening it later does not replay what was already there
    async fn remember_end(&mut self) {
        if let Ok(meta) = tokio::fs::metadata(&self.path).await {
            self.identity = Some(FileIdentity::from_metadata(&meta));
            self.offset = meta.len();
            self.target = meta.len();
        }
    }

    /// Reopen after the handle was dropped; keep the offset only if it is
    /// still the same file
    async fn reattach(&mut self) -> Result<()> {
        let previous = self.identity;
        let len = self.open_handle().await?;
        if previous != self.identity || self.offset > len {
            self.offset = 0;
        }
        Ok(())
    }

    async fn open_handle(&mut self) -> Result<u64> {
        self.file = None;
        let file = File::open(&self.path)
            .await
            .map_err(|e| TailError::io(&self.path, e))?;
        let meta = file
            .metadata()
            .await
            .map_err(|e| TailError::io(&self.path, e))?;

        self.identity = Some(FileIdentity::from_metadata(&meta));
        self.file = Some(file);
        Ok(meta.len())
    }
}

/// Read up to `want` bytes at `offset`, looping over short reads
async fn read_at(file: &mut File, offset: u64, want: usize) -> io::Result<BytesMut> {
    file.seek(SeekFrom::Start(offset)).await?;

    let mut buf = BytesMut::with_capacity(want);
    while buf.len() < want {
        let remaining = (want - buf.len()) as u64;
        let n = (&mut *file).take(remaining).read_buf(&mut buf).await?;
        if n == 0 {
            break;
        }
    }
    Ok(buf)
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod tests;
