//! Tests for the tail reader

use std::fs::{self, OpenOptions};
use std::io::Write;

use tempfile::TempDir;

use super::*;

const MAX_CHUNK: usize = 64 * 1024;

fn append(path: &Path, data: &[u8]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data).unwrap();
}

fn grew(path: &Path) -> WatchEvent {
    WatchEvent::Grew {
        size: fs::metadata(path).unwrap().len(),
    }
}

fn rotated(path: &Path) -> WatchEvent {
    let meta = fs::metadata(path).unwrap();
    WatchEvent::Rotated {
        identity: FileIdentity::from_metadata(&meta),
        size: meta.len(),
    }
}

async fn open_reader(path: &Path, max_chunk: usize) -> TailReader {
    TailReader::open(path, max_chunk, Arc::new(TailStats::new())).await
}

/// Drain everything the reader has pending after `event`
async fn read_all(reader: &mut TailReader, event: &WatchEvent) -> Vec<LogChunk> {
    let mut chunks = Vec::new();
    if let Some(chunk) = reader.read(event).await.unwrap() {
        chunks.push(chunk);
    }
    while reader.is_behind() {
        match reader.read_pending().await.unwrap() {
            Some(chunk) => chunks.push(chunk),
            None => break,
        }
    }
    chunks
}

fn concat(chunks: &[LogChunk]) -> Vec<u8> {
    chunks.iter().flat_map(|c| c.data().to_vec()).collect()
}

// ============================================================================
// Opening
// ============================================================================

#[tokio::test]
async fn test_open_starts_at_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"history that must not be replayed\n");

    let reader = open_reader(&path, MAX_CHUNK).await;
    assert!(reader.is_open());
    assert_eq!(reader.offset(), 34);
    assert!(!reader.is_behind());

    let (_, size) = reader.position().unwrap();
    assert_eq!(size, 34);
}

#[tokio::test]
async fn test_open_missing_file_is_detached() {
    let dir = TempDir::new().unwrap();
    let reader = open_reader(&dir.path().join("nope.log"), MAX_CHUNK).await;

    assert!(!reader.is_open());
    assert!(reader.position().is_none());
    assert_eq!(reader.offset(), 0);
}

// ============================================================================
// Growth
// ============================================================================

#[tokio::test]
async fn test_growth_yields_appended_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"old\n");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    append(&path, b"new line\n");

    let chunk = reader.read(&grew(&path)).await.unwrap().unwrap();
    assert_eq!(chunk.data().as_ref(), b"new line\n");
    assert_eq!(chunk.range(), 4..13);
    assert_eq!(reader.offset(), 13);
}

#[tokio::test]
async fn test_sequence_numbers_increase() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"");

    let mut reader = open_reader(&path, MAX_CHUNK).await;

    append(&path, b"a");
    let first = reader.read(&grew(&path)).await.unwrap().unwrap();
    append(&path, b"b");
    let second = reader.read(&grew(&path)).await.unwrap().unwrap();

    assert_eq!(second.seq(), first.seq() + 1);
    assert_eq!(first.end(), second.start());
}

#[tokio::test]
async fn test_large_growth_split_by_max_chunk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"");

    let mut reader = open_reader(&path, 10).await;
    let payload: Vec<u8> = (0..35u8).collect();
    append(&path, &payload);

    let chunks = read_all(&mut reader, &grew(&path)).await;
    assert_eq!(chunks.len(), 4);
    assert!(chunks.iter().all(|c| c.len() <= 10));
    assert_eq!(concat(&chunks), payload);
    assert_eq!(reader.offset(), 35);
}

#[tokio::test]
async fn test_forty_then_sixty_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"");

    let mut reader = open_reader(&path, MAX_CHUNK).await;

    let forty = vec![b'a'; 40];
    let sixty = vec![b'b'; 60];
    append(&path, &forty);
    append(&path, &sixty);

    // A single event after both writes may produce one combined chunk
    let chunks = read_all(&mut reader, &grew(&path)).await;
    let mut expected = forty.clone();
    expected.extend_from_slice(&sixty);
    assert_eq!(concat(&chunks), expected);
}

#[tokio::test]
async fn test_error_event_reads_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"x");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    let event = WatchEvent::Error(Arc::new(io::Error::from(io::ErrorKind::NotFound)));
    assert!(reader.read(&event).await.unwrap().is_none());
    assert!(reader.is_open());
}

// ============================================================================
// Rotation
// ============================================================================

#[tokio::test]
async fn test_rotation_reads_only_new_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"old file content\n");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    append(&path, b"unread tail of old file\n");

    fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    append(&path, b"fresh\n");

    let chunk = reader.read(&rotated(&path)).await.unwrap().unwrap();
    assert_eq!(chunk.data().as_ref(), b"fresh\n");
    assert_eq!(chunk.start(), 0);
    assert_eq!(reader.offset(), 6);
}

#[tokio::test]
async fn test_rotation_to_empty_file_resets_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"0123456789");

    let stats = Arc::new(TailStats::new());
    let mut reader = TailReader::open(&path, MAX_CHUNK, Arc::clone(&stats)).await;
    assert_eq!(reader.offset(), 10);

    fs::remove_file(&path).unwrap();
    append(&path, b"");

    assert!(reader.read(&rotated(&path)).await.unwrap().is_none());
    assert_eq!(reader.offset(), 0);
    assert_eq!(stats.snapshot().rotations, 1);
}

#[tokio::test]
async fn test_rotation_to_missing_file_is_transient() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"abc");

    let mut reader = open_reader(&path, MAX_CHUNK).await;

    // A replacement shows up and is gone again before the reader reopens
    fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    append(&path, b"");
    let event = rotated(&path);
    fs::remove_file(&path).unwrap();

    let err = reader.read(&event).await.unwrap_err();
    assert!(err.is_transient());
    assert!(!reader.is_open());
    assert_eq!(reader.offset(), 0);

    // The file comes back and grows; the reader reattaches from the start
    append(&path, b"back");
    let chunk = reader.read(&grew(&path)).await.unwrap().unwrap();
    assert_eq!(chunk.data().as_ref(), b"back");
    assert_eq!(chunk.start(), 0);
}

#[tokio::test]
async fn test_reattach_same_file_keeps_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"history\n");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    reader.file = None;
    append(&path, b"fresh\n");

    let chunks = read_all(&mut reader, &grew(&path)).await;
    assert!(reader.is_open());
    assert_eq!(concat(&chunks), b"fresh\n");
}

#[tokio::test]
async fn test_unopened_file_reattaches_on_rotated_without_replay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"history\n");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    reader.file = None;
    append(&path, b"fresh\n");

    // A watcher without a baseline reports its first sighting as a rotation
    let chunks = read_all(&mut reader, &rotated(&path)).await;
    assert_eq!(concat(&chunks), b"fresh\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_at_start_does_not_replay() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"history that must not be replayed\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::File::open(&path).is_ok() {
        // Permission bits are not enforced (running as root)
        return;
    }

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    assert!(!reader.is_open());
    assert_eq!(reader.offset(), 34);
    let (_, size) = reader.position().unwrap();
    assert_eq!(size, 34);

    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    append(&path, b"fresh\n");

    let chunks = read_all(&mut reader, &grew(&path)).await;
    assert_eq!(concat(&chunks), b"fresh\n");
}

#[tokio::test]
async fn test_missing_at_start_then_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("later.log");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    append(&path, b"first words\n");

    let chunk = reader.read(&rotated(&path)).await.unwrap().unwrap();
    assert_eq!(chunk.data().as_ref(), b"first words\n");
}

// ============================================================================
// Truncation
// ============================================================================

#[tokio::test]
async fn test_truncation_restarts_from_zero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"a long line before truncation\n");

    let stats = Arc::new(TailStats::new());
    let mut reader = TailReader::open(&path, MAX_CHUNK, Arc::clone(&stats)).await;

    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    append(&path, b"short\n");

    let chunk = reader.read(&grew(&path)).await.unwrap().unwrap();
    assert_eq!(chunk.data().as_ref(), b"short\n");
    assert_eq!(chunk.start(), 0);
    assert_eq!(reader.offset(), 6);
    assert_eq!(stats.snapshot().truncations, 1);
    assert_eq!(stats.snapshot().rotations, 0);
}

// ============================================================================
// Idle skipping
// ============================================================================

#[tokio::test]
async fn test_skip_advances_without_reading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"");

    let stats = Arc::new(TailStats::new());
    let mut reader = TailReader::open(&path, MAX_CHUNK, Arc::clone(&stats)).await;

    append(&path, b"nobody is watching\n");
    reader.skip(&grew(&path)).await.unwrap();
    assert_eq!(reader.offset(), 19);
    assert!(!reader.is_behind());
    assert_eq!(stats.snapshot().bytes_read, 0);

    append(&path, b"seen\n");
    let chunk = reader.read(&grew(&path)).await.unwrap().unwrap();
    assert_eq!(chunk.data().as_ref(), b"seen\n");
}

#[tokio::test]
async fn test_skip_rotation_positions_at_new_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, b"old");

    let mut reader = open_reader(&path, MAX_CHUNK).await;
    fs::rename(&path, dir.path().join("app.log.1")).unwrap();
    append(&path, b"written before anyone subscribed");

    reader.skip(&rotated(&path)).await.unwrap();
    assert_eq!(reader.offset(), 32);
}
