use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use preprocessing_core::WorkerStatus;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// What this worker serves and how busy it is.
#[derive(Debug, Serialize)]
pub struct WorkerInfoResponse {
    pub namespace: String,
    pub task_queue: String,
    pub workflow_name: String,
    pub shared_path: PathBuf,
    #[serde(flatten)]
    pub status: WorkerStatus,
}

pub async fn worker_info(State(state): State<Arc<AppState>>) -> Json<WorkerInfoResponse> {
    let config = state.config();
    Json(WorkerInfoResponse {
        namespace: config.temporal.namespace.clone(),
        task_queue: config.temporal.task_queue.clone(),
        workflow_name: config.temporal.workflow_name.clone(),
        shared_path: state.worker().workflow().shared_path().to_path_buf(),
        status: state.worker().status(),
    })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
