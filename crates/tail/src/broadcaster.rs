//! Per-log fan-out
//!
//! The `Broadcaster` delivers each [`LogChunk`] to every registered
//! subscriber through its own bounded queue. Publishing never waits on a
//! consumer: a subscriber whose queue is full is disconnected
//! (disconnect-on-full) and its session sees [`Termination::Backpressure`].
//!
//! The registration list sits behind a reader-writer lock. `publish` holds
//! the read side while it iterates; subscribe and unsubscribe take the write
//! side. An unsubscribe that wins the race is never delivered to afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::chunk::LogChunk;
use crate::error::{Result, TailError};
use crate::subscriber::{Subscriber, SubscriberShared, Termination};

/// Default per-subscriber queue length
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default subscriber limit per log
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 100;

/// The broadcaster's side of a subscription
#[derive(Debug)]
struct Registration {
    id: u64,
    sender: mpsc::Sender<Arc<LogChunk>>,
    shared: Arc<SubscriberShared>,
}

/// Outcome of one [`Broadcaster::publish`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the chunk
    pub delivered: usize,
    /// Subscribers disconnected because their queue was full
    pub disconnected: usize,
}

/// Fan-out group for one tracked file
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: RwLock<Vec<Registration>>,
    /// Quick check for the idle path
    has_subscribers: AtomicBool,
    closed: AtomicBool,
    next_id: AtomicU64,
    queue_capacity: usize,
    max_subscribers: usize,
}

impl Broadcaster {
    pub fn new(queue_capacity: usize, max_subscribers: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            has_subscribers: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
            max_subscribers,
        }
    }

    /// Register a new subscriber.
    ///
    /// Fails when the subscriber limit is reached or the broadcaster was
    /// closed.
    pub fn subscribe(self: &Arc<Self>) -> Result<Subscriber> {
        let mut subscribers = self.subscribers.write();

        if self.closed.load(Ordering::Acquire) {
            return Err(TailError::Closed);
        }
        if subscribers.len() >= self.max_subscribers {
            return Err(TailError::MaxSubscribers {
                max: self.max_subscribers,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let shared = Arc::new(SubscriberShared::new());

        subscribers.push(Registration {
            id,
            sender,
            shared: Arc::clone(&shared),
        });
        self.has_subscribers.store(true, Ordering::Release);

        debug!(id, count = subscribers.len(), "subscriber registered");
        Ok(Subscriber::new(id, receiver, shared, Arc::downgrade(self)))
    }

    /// Explicitly release a subscriber. Dropping it has the same effect.
    pub fn unsubscribe(&self, mut subscriber: Subscriber) {
        subscriber.release();
    }

    /// Deliver a chunk to every registered subscriber without blocking
    pub fn publish(&self, chunk: Arc<LogChunk>) -> PublishReport {
        let mut report = PublishReport::default();
        let mut full = Vec::new();
        let mut gone = Vec::new();

        {
            let subscribers = self.subscribers.read();
            for registration in subscribers.iter() {
                match registration.sender.try_send(Arc::clone(&chunk)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => full.push(registration.id),
                    Err(TrySendError::Closed(_)) => gone.push(registration.id),
                }
            }
        }

        if full.is_empty() && gone.is_empty() {
            return report;
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|registration| {
            if full.contains(&registration.id) {
                // Reason first: the session reads it once the sender is gone
                registration.shared.terminate(Termination::Backpressure);
                warn!(
                    id = registration.id,
                    seq = chunk.seq(),
                    "subscriber queue full, disconnecting"
                );
                report.disconnected += 1;
                false
            } else {
                !gone.contains(&registration.id)
            }
        });
        self.has_subscribers
            .store(!subscribers.is_empty(), Ordering::Release);

        report
    }

    /// End every current subscription with `reason`
    pub fn terminate_all(&self, reason: Termination) -> usize {
        let mut subscribers = self.subscribers.write();
        let count = subscribers.len();
        for registration in subscribers.drain(..) {
            registration.shared.terminate(reason);
        }
        self.has_subscribers.store(false, Ordering::Release);

        if count > 0 {
            debug!(count, %reason, "terminated subscribers");
        }
        count
    }

    /// Terminate everyone with [`Termination::Shutdown`] and refuse new
    /// subscribers
    pub fn close(&self) -> usize {
        // Set under the write lock so no subscribe slips in between
        let count = {
            let subscribers = self.subscribers.write();
            self.closed.store(true, Ordering::Release);
            subscribers.len()
        };
        if count > 0 {
            self.terminate_all(Termination::Shutdown);
        }
        count
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Lock-free check used by the tail loop on every event
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.has_subscribers.load(Ordering::Acquire)
    }

    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }

    pub(crate) fn remove(&self, id: u64) {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|registration| registration.id != id);
        self.has_subscribers
            .store(!subscribers.is_empty(), Ordering::Release);

        if subscribers.len() < before {
            debug!(id, count = subscribers.len(), "subscriber released");
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_MAX_SUBSCRIBERS)
    }
}

#[cfg(test)]
#[path = "broadcaster_test.rs"]
mod tests;
