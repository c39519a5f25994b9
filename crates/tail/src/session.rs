//! Stream session
//!
//! `StreamSession` is the per-connection end of a subscription. It is a
//! `Stream` of body frames meant to be handed straight to an HTTP response
//! body; each chunk becomes one frame, so it is flushed as soon as it
//! arrives.
//!
//! ```text
//! STARTING ──first poll──→ STREAMING ──┬─→ CLOSED_BY_CLIENT      (body dropped)
//!                                      ├─→ CLOSED_BY_SERVER(..)  (backpressure, shutdown)
//!                                      └─→ CLOSED_BY_FILE_ERROR
//! ```
//!
//! Every terminal state releases the subscription exactly once.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::subscriber::{Subscriber, Termination};

/// Why the server closed a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerClose {
    Backpressure,
    Shutdown,
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Streaming,
    ClosedByClient,
    ClosedByServer(ServerClose),
    ClosedByFileError,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Starting | SessionState::Streaming)
    }

    fn from_termination(reason: Termination) -> Self {
        match reason {
            Termination::Backpressure => SessionState::ClosedByServer(ServerClose::Backpressure),
            Termination::Shutdown => SessionState::ClosedByServer(ServerClose::Shutdown),
            Termination::FileError => SessionState::ClosedByFileError,
        }
    }
}

/// One viewer's streamed response
#[derive(Debug)]
pub struct StreamSession {
    log: Arc<str>,
    subscriber: Option<Subscriber>,
    state: watch::Sender<SessionState>,
    bytes_sent: u64,
    chunks_sent: u64,
}

impl StreamSession {
    pub fn new(log: impl Into<Arc<str>>, subscriber: Subscriber) -> Self {
        let log = log.into();
        debug!(log = %log, subscriber = subscriber.id(), "session starting");

        Self {
            log,
            subscriber: Some(subscriber),
            state: watch::Sender::new(SessionState::Starting),
            bytes_sent: 0,
            chunks_sent: 0,
        }
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follow state changes, including the final one made on drop
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    /// Release the subscription and enter a terminal state
    fn close(&mut self, next: SessionState) {
        let Some(subscriber) = self.subscriber.take() else {
            return;
        };
        let id = subscriber.id();
        let unsent = subscriber.pending();
        drop(subscriber);

        self.state.send_replace(next);
        match next {
            SessionState::ClosedByClient => debug!(
                log = %self.log,
                subscriber = id,
                bytes = self.bytes_sent,
                unsent,
                "viewer disconnected"
            ),
            _ => info!(
                log = %self.log,
                subscriber = id,
                bytes = self.bytes_sent,
                state = ?next,
                "session closed by server"
            ),
        }
    }
}

impl Stream for StreamSession {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(subscriber) = this.subscriber.as_mut() else {
            return Poll::Ready(None);
        };

        if *this.state.borrow() == SessionState::Starting {
            this.state.send_replace(SessionState::Streaming);
        }

        match subscriber.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                this.bytes_sent += chunk.len() as u64;
                this.chunks_sent += 1;
                trace!(log = %this.log, seq = chunk.seq(), len = chunk.len(), "chunk sent");
                Poll::Ready(Some(Ok(chunk.data().clone())))
            }
            Poll::Ready(None) => {
                let reason = subscriber.termination().unwrap_or(Termination::Shutdown);
                this.close(SessionState::from_termination(reason));
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close(SessionState::ClosedByClient);
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
