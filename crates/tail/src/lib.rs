//! Lookout Tail - live tailing of log files with per-viewer fan-out
//!
//! This crate watches growing (and rotating) log files and streams newly
//! appended bytes to any number of concurrent viewers:
//!
//! - One task per file owns the read offset and handle
//! - Chunks are shared (`Arc`) between viewers, never copied per viewer
//! - Each viewer has a bounded queue; a viewer that falls behind is
//!   disconnected instead of stalling the others
//! - Nothing is read while nobody is watching
//!
//! # Architecture
//!
//! ```text
//! log file ──stat/notify──→ FileWatcher
//!                               │ GREW / ROTATED / ERROR
//!                               ▼
//!                           TailReader (offset, handle)
//!                               │ LogChunk
//!                               ▼
//!                           Broadcaster ◄── subscribe / unsubscribe
//!                          ┌────┴────┐
//!                          ▼         ▼
//!                     Subscriber  Subscriber   (bounded queues)
//!                          │         │
//!                          ▼         ▼
//!                    StreamSession StreamSession ──→ HTTP response bodies
//! ```

mod broadcaster;
mod chunk;
mod error;
mod reader;
mod registry;
mod session;
mod stats;
mod subscriber;
mod tail_point;
mod watcher;

pub use broadcaster::{Broadcaster, DEFAULT_MAX_SUBSCRIBERS, DEFAULT_QUEUE_CAPACITY, PublishReport};
pub use chunk::LogChunk;
pub use error::{Result, TailError};
pub use reader::TailReader;
pub use registry::TailRegistry;
pub use session::{ServerClose, SessionState, StreamSession};
pub use stats::{TailStats, TailStatsSnapshot};
pub use subscriber::{Subscriber, Termination};
pub use tail_point::{DEFAULT_MAX_CHUNK_BYTES, DEFAULT_POLL_INTERVAL, TailOptions, TailPoint};
pub use watcher::{FileIdentity, FileWatcher, Position, WatchEvent};
