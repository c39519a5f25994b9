//! API routes
//!
//! Debug routes (logs, profiling) carry the revision header; ops routes do
//! not.

pub mod log;
pub mod ops;
pub mod pprof;

use axum::{Router, middleware};

use crate::revision::revision_header;
use crate::state::AppState;

/// Build the complete router
pub fn build_router(state: AppState) -> Router {
    let debug_routes = Router::new()
        .merge(log::routes())
        .merge(pprof::routes())
        .layer(middleware::from_fn_with_state(state.clone(), revision_header));

    Router::new()
        .merge(debug_routes)
        .merge(ops::routes())
        .with_state(state)
}
