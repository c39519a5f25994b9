//! Counters for one tail point

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counters, updated by the tail task and the broadcaster
#[derive(Debug, Default)]
pub struct TailStats {
    chunks_read: AtomicU64,
    bytes_read: AtomicU64,
    chunks_delivered: AtomicU64,
    slow_disconnects: AtomicU64,
    rotations: AtomicU64,
    truncations: AtomicU64,
}

impl TailStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_read(&self, bytes: usize) {
        self.chunks_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_delivered(&self, count: usize) {
        self.chunks_delivered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_slow_disconnects(&self, count: usize) {
        self.slow_disconnects
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_truncation(&self) {
        self.truncations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TailStatsSnapshot {
        TailStatsSnapshot {
            chunks_read: self.chunks_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            chunks_delivered: self.chunks_delivered.load(Ordering::Relaxed),
            slow_disconnects: self.slow_disconnects.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            truncations: self.truncations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TailStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TailStatsSnapshot {
    /// Chunks read from the file
    pub chunks_read: u64,
    /// Bytes read from the file
    pub bytes_read: u64,
    /// Chunk deliveries summed over subscribers
    pub chunks_delivered: u64,
    /// Subscribers dropped for falling behind
    pub slow_disconnects: u64,
    pub rotations: u64,
    pub truncations: u64,
}
