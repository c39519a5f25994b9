//! Live log routes
//!
//! `GET /debug/log/{name}` streams newly appended bytes of a configured log
//! for as long as the client stays connected. The body never ends on its
//! own; it ends when the client goes away, the viewer falls too far behind,
//! the file fails, or the server shuts down.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use lookout_tail::TailStatsSnapshot;

use crate::error::{ApiError, Result};
use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// One configured log
#[derive(Debug, Serialize)]
pub struct LogSummary {
    pub name: String,
    pub path: PathBuf,
    pub running: bool,
    pub subscribers: usize,
    pub max_subscribers: usize,
    pub stats: TailStatsSnapshot,
}

/// `GET /debug/log` body
#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub logs: Vec<LogSummary>,
}

// =============================================================================
// Routes
// =============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/debug/log", get(list_handler))
        .route("/debug/log/{name}", get(stream_handler))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /debug/log
async fn list_handler(State(state): State<AppState>) -> Json<LogListResponse> {
    let logs = state
        .tails
        .iter()
        .map(|tail| LogSummary {
            name: tail.name().to_string(),
            path: tail.path().to_path_buf(),
            running: tail.is_running(),
            subscribers: tail.subscriber_count(),
            max_subscribers: tail.max_subscribers(),
            stats: tail.stats(),
        })
        .collect();

    Json(LogListResponse { logs })
}

/// GET /debug/log/{name}
async fn stream_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let tail = state
        .tails
        .get(&name)
        .ok_or_else(|| ApiError::not_found("log", &name))?;

    let session = tail
        .open_session()
        .map_err(|e| ApiError::from_tail(&name, e))?;

    info!(
        log = %name,
        path = %tail.path().display(),
        viewers = tail.subscriber_count(),
        "viewer connected"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            // Keep reverse proxies from buffering the stream
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(session),
    )
        .into_response())
}
