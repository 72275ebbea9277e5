//! Axum router configuration with middleware.
//!
//! Middleware, outermost first: request id assignment, request tracing,
//! request id propagation to the response, and panic recovery.

use axum::Router;
use axum::http::HeaderName;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// (method, path, description) of every route, for the startup banner.
pub const ENDPOINTS: [(&str, &str, &str); 4] = [
    ("GET", "/", "Service and endpoint catalogue"),
    ("GET", "/health", "Health check"),
    ("POST", "/api/chat", "Send a message to the agent"),
    ("GET", "/api/tools", "How to discover the agent's tools"),
];

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/", get(handlers::info::root))
        .route("/health", get(handlers::info::health))
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/tools", get(handlers::info::tools))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CatchPanicLayer::new()),
        )
        .with_state(state)
}
