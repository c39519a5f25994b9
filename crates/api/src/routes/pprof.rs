//! Profiling routes
//!
//! Path-compatible with the usual `/debug/pprof` layout so existing
//! collectors can fetch from them.
//!
//! - `profile?seconds=N`: CPU profile as pprof protobuf (default 30 s)
//! - `/debug/fgprof?seconds=N&format=folded|pprof`: the same sampler,
//!   collapsed stacks by default
//! - `symbol` and `trace` have no native counterpart and answer `501`

use axum::Router;
use axum::extract::{Path, Query};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Profiles listed on the index page
const PROFILES: &[(&str, &str)] = &[
    ("cmdline", "The command line invocation of the current program"),
    (
        "profile",
        "CPU profile. You can specify the duration in the seconds GET parameter",
    ),
    ("symbol", "Symbol lookup (not supported)"),
    ("trace", "Execution trace (not supported)"),
];

/// Query of the sampling routes
#[derive(Debug, Default, Deserialize)]
struct ProfileParams {
    /// Kept as text so a malformed value falls back to the default
    seconds: Option<String>,
    format: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/debug/pprof/cmdline", get(cmdline_handler))
        .route("/debug/pprof/profile", get(profile_handler))
        .route("/debug/pprof/symbol", get(symbol_handler).post(symbol_handler))
        .route("/debug/pprof/trace", get(trace_handler))
        .route("/debug/pprof/", get(index_handler))
        .route("/debug/pprof/{*rest}", get(named_handler))
        .route("/debug/fgprof", get(fgprof_handler))
}

/// GET /debug/pprof/cmdline
///
/// Arguments separated by NUL bytes.
async fn cmdline_handler() -> impl IntoResponse {
    let cmdline = std::env::args().collect::<Vec<_>>().join("\0");
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], cmdline)
}

/// GET /debug/pprof/
async fn index_handler() -> impl IntoResponse {
    let mut body = String::from("/debug/pprof/\n\nProfile Descriptions:\n\n");
    for (name, description) in PROFILES {
        body.push_str(&format!("{name}: {description}\n"));
    }
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

/// GET /debug/pprof/{name}: the index for unknown names
async fn named_handler(Path(rest): Path<String>) -> Result<impl IntoResponse> {
    if rest.is_empty() {
        return Ok(index_handler().await);
    }
    Err(ApiError::NotFound(format!("unknown profile: {rest}")))
}

/// GET /debug/pprof/profile
#[cfg(unix)]
async fn profile_handler(Query(params): Query<ProfileParams>) -> Result<Response> {
    use crate::profiler::{self, ProfileFormat};

    let duration = profiler::profile_duration(params.seconds.as_deref());
    let body = profiler::profile(duration, ProfileFormat::Pprof).await?;
    Ok(profile_response(ProfileFormat::Pprof, "profile", body))
}

/// GET /debug/fgprof
#[cfg(unix)]
async fn fgprof_handler(Query(params): Query<ProfileParams>) -> Result<Response> {
    use crate::profiler::{self, ProfileFormat};

    let format = match params.format.as_deref() {
        None | Some("") | Some("folded") => ProfileFormat::Folded,
        Some("pprof") => ProfileFormat::Pprof,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("unknown format: {other}")));
        }
    };

    let duration = profiler::profile_duration(params.seconds.as_deref());
    let body = profiler::profile(duration, format).await?;
    Ok(profile_response(format, "fgprof", body))
}

#[cfg(unix)]
fn profile_response(
    format: crate::profiler::ProfileFormat,
    name: &str,
    body: Vec<u8>,
) -> Response {
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(not(unix))]
async fn profile_handler(Query(_): Query<ProfileParams>) -> Result<Response> {
    Err(no_profiler("profile"))
}

#[cfg(not(unix))]
async fn fgprof_handler(Query(_): Query<ProfileParams>) -> Result<Response> {
    Err(no_profiler("fgprof"))
}

async fn symbol_handler() -> Result<()> {
    Err(no_profiler("symbol"))
}

async fn trace_handler() -> Result<()> {
    Err(no_profiler("trace"))
}

fn no_profiler(profile: &str) -> ApiError {
    ApiError::NotImplemented(format!("{profile}: not supported by this process"))
}
