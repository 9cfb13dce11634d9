use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware, workflows};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and worker status
        .route("/health", get(handlers::health))
        .route("/worker", get(handlers::worker_info))
        // Workflow runs
        .route("/workflows/{name}/runs", post(workflows::submit_run))
        .route("/runs/{run_id}/history", get(workflows::run_history));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
