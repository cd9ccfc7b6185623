//! HTTP routers for the two servers.
//!
//! Both routers catch every path: unmatched requests land on the root
//! banner. Request tracing is applied via middleware that generates a unique
//! request ID for each incoming request.

pub mod health;
pub mod root;

use axum::{middleware, routing::any, Router};
use http::header::{HeaderValue, X_CONTENT_TYPE_OPTIONS};
use http::StatusCode;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::middleware::request_id_layer;
use crate::profiling;
use crate::state::AppState;

/// Router for the SQLite linkage demo: one handler for everything.
pub fn create_sqlite_router() -> Router {
    Router::new()
        .fallback(root::sqlite_index)
        .layer(middleware::from_fn(request_id_layer))
}

/// Router for the production demo: banner, liveness probe, profiling.
pub fn create_production_router(state: AppState) -> Router {
    // Profiling - never sniffed by browsers
    let profiling_routes = profiling::routes().layer(SetResponseHeaderLayer::overriding(
        X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    ));

    // Health check - liveness probes may use any method
    let health_routes = Router::new().route("/health", any(health::health));

    let mut router = Router::new()
        .route("/", any(root::production_index))
        .merge(health_routes)
        .merge(profiling_routes)
        .fallback(root::production_index)
        .with_state(state.clone());

    // Write timeout - bound how long a handler may take to respond
    if let Some(write_timeout) = state.write_timeout() {
        router = router.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            write_timeout,
        ));
    }

    // Request ID middleware - creates root span with request_id for correlation
    router.layer(middleware::from_fn(request_id_layer))
}
