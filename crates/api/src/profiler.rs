//! CPU sampling for the profiling routes
//!
//! Samples the whole process with `pprof` (SIGPROF based) for a fixed
//! window. Only one window may run at a time; the profiler is process-wide.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pprof::protos::Message;
use tracing::{debug, info};

use crate::error::{ApiError, Result};

/// Window used when `seconds` is missing or not a positive integer
pub const DEFAULT_PROFILE_SECONDS: u64 = 30;

/// Longest window a caller may ask for
pub const MAX_PROFILE_SECONDS: u64 = 300;

/// Samples per second
const SAMPLE_FREQUENCY: i32 = 100;

/// Frames from these libraries are dropped from the stacks
const BLOCKLIST: &[&str] = &["libc", "libgcc", "pthread", "vdso"];

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Output encoding of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    /// pprof protobuf, uncompressed
    Pprof,
    /// One `frame;frame;frame count` line per distinct stack
    Folded,
}

impl ProfileFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ProfileFormat::Pprof => "application/octet-stream",
            ProfileFormat::Folded => "text/plain; charset=utf-8",
        }
    }
}

/// Parse a `seconds` query value, falling back to the default for anything
/// that is not a positive integer
pub fn profile_duration(seconds: Option<&str>) -> Duration {
    let seconds = seconds
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_PROFILE_SECONDS)
        .min(MAX_PROFILE_SECONDS);
    Duration::from_secs(seconds)
}

/// Clears [`ACTIVE`] when the window ends, however it ends
struct ActiveWindow;

impl ActiveWindow {
    fn acquire() -> Option<Self> {
        ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(ActiveWindow)
    }
}

impl Drop for ActiveWindow {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::Release);
    }
}

/// Sample the process for `duration` and encode the result
pub async fn profile(duration: Duration, format: ProfileFormat) -> Result<Vec<u8>> {
    let window = ActiveWindow::acquire().ok_or(ApiError::ProfileInProgress)?;
    info!(seconds = duration.as_secs(), ?format, "cpu profile started");

    // The guard is tied to the sampling thread, so the whole window runs
    // on the blocking pool
    let body = tokio::task::spawn_blocking(move || {
        let _window = window;
        sample(duration, format)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("profiler task failed: {e}")))??;

    debug!(bytes = body.len(), "cpu profile finished");
    Ok(body)
}

fn sample(duration: Duration, format: ProfileFormat) -> Result<Vec<u8>> {
    let guard = pprof::ProfilerGuardBuilder::default()
        .frequency(SAMPLE_FREQUENCY)
        .blocklist(BLOCKLIST)
        .build()
        .map_err(profiler_error)?;

    std::thread::sleep(duration);

    let report = guard.report().build().map_err(profiler_error)?;
    match format {
        ProfileFormat::Pprof => {
            let profile = report.pprof().map_err(profiler_error)?;
            Ok(profile.encode_to_vec())
        }
        ProfileFormat::Folded => Ok(folded(&report).into_bytes()),
    }
}

/// Collapsed stacks, root first, thread name as the outermost frame
fn folded(report: &pprof::Report) -> String {
    let mut lines = report
        .data
        .iter()
        .map(|(frames, count)| {
            let mut line = frames.thread_name.clone();
            for frame in frames.frames.iter().rev() {
                for symbol in frame.iter().rev() {
                    let _ = write!(line, ";{symbol}");
                }
            }
            let _ = write!(line, " {count}");
            line
        })
        .collect::<Vec<_>>();
    lines.sort();

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn profiler_error(err: pprof::Error) -> ApiError {
    ApiError::Internal(format!("profiler: {err}"))
}
