//! Log chunks
//!
//! A `LogChunk` is one read from a tailed file. The payload is a `Bytes`
//! handle, so every subscriber shares the same allocation.

use std::ops::Range;

use bytes::Bytes;

/// Bytes appended to a tailed file, with their position and sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    seq: u64,
    start: u64,
    data: Bytes,
}

impl LogChunk {
    pub fn new(seq: u64, start: u64, data: Bytes) -> Self {
        Self { seq, start, data }
    }

    /// Sequence number, strictly increasing per tail point
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Offset of the first byte within the file it was read from
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Offset one past the last byte
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    pub fn range(&self) -> Range<u64> {
        self.start..self.end()
    }

    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
