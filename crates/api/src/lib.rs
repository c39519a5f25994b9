//! Lookout API
//!
//! HTTP debug routes for a running service, built on Axum.
//!
//! # Usage
//!
//! ```ignore
//! use lookout_api::{build_router, AppState};
//!
//! let tails = Arc::new(TailRegistry::spawn(logs, options, &cancel));
//! let state = AppState::new(tails).with_revision(source);
//!
//! let app = build_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:19000").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Endpoints
//!
//! ## Logs
//! - `GET /debug/log` - Configured logs with viewer counts and stats
//! - `GET /debug/log/{name}` - Live stream of a log (`text/plain`, open-ended)
//!
//! ## Profiling
//! - `GET /debug/pprof/` - Index
//! - `GET /debug/pprof/cmdline` - Process arguments, NUL separated
//! - `GET /debug/pprof/profile?seconds=N` - CPU profile (pprof protobuf)
//! - `GET /debug/fgprof?seconds=N&format=folded|pprof` - CPU profile, collapsed stacks
//! - `GET /debug/pprof/{symbol,trace}` - Not supported (`501`)
//!
//! ## Operations
//! - `GET /health` - Liveness and uptime
//!
//! Every `/debug` response carries `X-Git-Repository` with the served
//! commit's metadata when a revision source is configured and answers.

pub mod error;
#[cfg(unix)]
pub mod profiler;
pub mod revision;
pub mod routes;
pub mod state;

// Re-exports
pub use error::{ApiError, Result};
pub use revision::{RevisionSource, X_GIT_REPOSITORY, revision_header};
pub use routes::build_router;
pub use state::AppState;
