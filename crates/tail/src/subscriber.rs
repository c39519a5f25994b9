//! Subscriber handle for one viewer of a log
//!
//! A `Subscriber` is owned by its session. The [`Broadcaster`] keeps only a
//! registration entry (sender + shared flags). The handle releases that entry
//! exactly once, either through [`Broadcaster::unsubscribe`] or on drop.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use tokio::sync::mpsc;

use crate::broadcaster::Broadcaster;
use crate::chunk::LogChunk;

/// Why the server ended a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The subscriber's queue was full when a chunk was published
    Backpressure,
    /// The tailed file failed while being read
    FileError,
    /// The tail point is shutting down
    Shutdown,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Backpressure => "backpressure",
            Termination::FileError => "file_error",
            Termination::Shutdown => "shutdown",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Termination::Backpressure => 1,
            Termination::FileError => 2,
            Termination::Shutdown => 3,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Termination::Backpressure),
            2 => Some(Termination::FileError),
            3 => Some(Termination::Shutdown),
            _ => None,
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared between a subscriber and its registration entry
#[derive(Debug)]
pub(crate) struct SubscriberShared {
    alive: AtomicBool,
    termination: AtomicU8,
}

impl SubscriberShared {
    pub(crate) fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            termination: AtomicU8::new(0),
        }
    }

    /// Record the first termination reason; later ones are ignored
    pub(crate) fn terminate(&self, reason: Termination) {
        let _ = self.termination.compare_exchange(
            0,
            reason.to_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.alive.store(false, Ordering::Release);
    }

    pub(crate) fn mark_released(&self) {
        self.alive.store(false, Ordering::Release);
    }

    fn termination(&self) -> Option<Termination> {
        Termination::from_u8(self.termination.load(Ordering::Acquire))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// One viewer's subscription to a log
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    receiver: mpsc::Receiver<Arc<LogChunk>>,
    shared: Arc<SubscriberShared>,
    broadcaster: Weak<Broadcaster>,
    last_seq: Option<u64>,
    released: bool,
}

impl Subscriber {
    pub(crate) fn new(
        id: u64,
        receiver: mpsc::Receiver<Arc<LogChunk>>,
        shared: Arc<SubscriberShared>,
        broadcaster: Weak<Broadcaster>,
    ) -> Self {
        Self {
            id,
            receiver,
            shared,
            broadcaster,
            last_seq: None,
            released: false,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next chunk, or `None` once the server ended the subscription and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<Arc<LogChunk>> {
        let chunk = self.receiver.recv().await?;
        self.last_seq = Some(chunk.seq());
        Some(chunk)
    }

    /// Poll variant of [`recv`](Self::recv)
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Arc<LogChunk>>> {
        let polled = self.receiver.poll_recv(cx);
        if let Poll::Ready(Some(chunk)) = &polled {
            self.last_seq = Some(chunk.seq());
        }
        polled
    }

    /// Why the server ended this subscription, if it did.
    ///
    /// A closed queue with no recorded reason means the broadcaster itself
    /// went away, which only happens at shutdown.
    pub fn termination(&self) -> Option<Termination> {
        match self.shared.termination() {
            Some(reason) => Some(reason),
            None if self.receiver.is_closed() && !self.released => Some(Termination::Shutdown),
            None => None,
        }
    }

    /// Whether the registration is still in place
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Sequence number of the last chunk handed out
    #[inline]
    pub fn last_delivered_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// Chunks waiting in the queue
    #[inline]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Remove the registration. Idempotent.
    pub(crate) fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.shared.mark_released();
        if let Some(broadcaster) = self.broadcaster.upgrade() {
            broadcaster.remove(self.id);
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.release();
    }
}
