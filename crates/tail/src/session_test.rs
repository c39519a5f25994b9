//! Tests for stream sessions

use std::time::Duration;

use futures_util::StreamExt;

use super::*;
use crate::broadcaster::Broadcaster;
use crate::chunk::LogChunk;

fn chunk(seq: u64, data: &'static [u8]) -> Arc<LogChunk> {
    Arc::new(LogChunk::new(seq, 0, Bytes::from_static(data)))
}

async fn next(session: &mut StreamSession) -> Option<Bytes> {
    tokio::time::timeout(Duration::from_secs(1), session.next())
        .await
        .expect("session stalled")
        .map(|frame| frame.unwrap())
}

#[tokio::test]
async fn test_streams_chunks_in_order() {
    let broadcaster = Arc::new(Broadcaster::default());
    let mut session = StreamSession::new("httplog", broadcaster.subscribe().unwrap());
    assert_eq!(session.state(), SessionState::Starting);

    broadcaster.publish(chunk(1, b"GET /a\n"));
    broadcaster.publish(chunk(2, b"GET /b\n"));

    assert_eq!(next(&mut session).await.unwrap(), "GET /a\n");
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(next(&mut session).await.unwrap(), "GET /b\n");

    assert_eq!(session.chunks_sent(), 2);
    assert_eq!(session.bytes_sent(), 14);
    assert_eq!(session.log(), "httplog");
}

#[tokio::test]
async fn test_drop_is_closed_by_client() {
    let broadcaster = Arc::new(Broadcaster::default());
    let session = StreamSession::new("httplog", broadcaster.subscribe().unwrap());
    let state = session.subscribe_state();
    assert_eq!(broadcaster.subscriber_count(), 1);

    drop(session);
    assert_eq!(*state.borrow(), SessionState::ClosedByClient);
    assert_eq!(broadcaster.subscriber_count(), 0);
}

#[tokio::test]
async fn test_backpressure_closes_by_server() {
    let broadcaster = Arc::new(Broadcaster::new(1, 10));
    let mut session = StreamSession::new("slowlog", broadcaster.subscribe().unwrap());
    let state = session.subscribe_state();

    broadcaster.publish(chunk(1, b"kept"));
    let report = broadcaster.publish(chunk(2, b"overflow"));
    assert_eq!(report.disconnected, 1);

    assert_eq!(next(&mut session).await.unwrap(), "kept");
    assert!(next(&mut session).await.is_none());
    assert_eq!(
        session.state(),
        SessionState::ClosedByServer(ServerClose::Backpressure)
    );

    // Terminal state survives the drop
    drop(session);
    assert_eq!(
        *state.borrow(),
        SessionState::ClosedByServer(ServerClose::Backpressure)
    );
}

#[tokio::test]
async fn test_shutdown_closes_by_server() {
    let broadcaster = Arc::new(Broadcaster::default());
    let mut session = StreamSession::new("httplog", broadcaster.subscribe().unwrap());

    broadcaster.close();
    assert!(next(&mut session).await.is_none());
    assert_eq!(
        session.state(),
        SessionState::ClosedByServer(ServerClose::Shutdown)
    );
    assert!(session.state().is_terminal());
}

#[tokio::test]
async fn test_file_error_state() {
    let broadcaster = Arc::new(Broadcaster::default());
    let mut session = StreamSession::new("httplog", broadcaster.subscribe().unwrap());

    broadcaster.terminate_all(Termination::FileError);
    assert!(next(&mut session).await.is_none());
    assert_eq!(session.state(), SessionState::ClosedByFileError);

    // Ended streams stay ended
    assert!(next(&mut session).await.is_none());
}

#[tokio::test]
async fn test_session_waits_for_data() {
    let broadcaster = Arc::new(Broadcaster::default());
    let mut session = StreamSession::new("httplog", broadcaster.subscribe().unwrap());

    let pending = tokio::time::timeout(Duration::from_millis(50), session.next()).await;
    assert!(pending.is_err());
    assert_eq!(session.state(), SessionState::Streaming);
}
