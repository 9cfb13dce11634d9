//! Workflow run API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use preprocessing_core::runtime::HistoryEntry;
use preprocessing_core::{PreprocessingResult, WorkerError};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a run.
///
/// Every field except `run_id` is handed to the workflow as its parameters.
#[derive(Debug, Deserialize)]
pub struct SubmitRunBody {
    /// Reuse an id to replay a recorded run. A new id is generated if absent.
    #[serde(default, alias = "runId")]
    pub run_id: Option<String>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl SubmitRunBody {
    /// Workflow input; `null` when no parameters were sent.
    fn input(self) -> Value {
        if self.params.is_empty() {
            Value::Null
        } else {
            Value::Object(self.params)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: String,
    #[serde(flatten)]
    pub result: PreprocessingResult,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub run_id: String,
    pub entries: Vec<HistoryEntry>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct RunErrorResponse {
    pub error: String,
    #[serde(rename = "nonRetryable")]
    pub non_retryable: bool,
}

type ApiError = (StatusCode, Json<RunErrorResponse>);

fn error_response(status: StatusCode, error: String, non_retryable: bool) -> ApiError {
    (
        status,
        Json(RunErrorResponse {
            error,
            non_retryable,
        }),
    )
}

fn worker_error(err: WorkerError) -> ApiError {
    let status = match &err {
        WorkerError::Workflow(_) => StatusCode::BAD_REQUEST,
        WorkerError::AlreadyRunning(_) => StatusCode::CONFLICT,
        WorkerError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        WorkerError::History(_) | WorkerError::Nondeterminism { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let non_retryable = !err.is_retryable();
    error_response(status, err.to_string(), non_retryable)
}

// ============================================================================
// Handlers
// ============================================================================

/// Execute a run of the named workflow and wait for its result.
pub async fn submit_run(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SubmitRunBody>,
) -> Result<Json<RunResponse>, ApiError> {
    if !state.serves_workflow(&name) {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Workflow not found: {}", name),
            true,
        ));
    }

    let run_id = body
        .run_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(run_id = %run_id, workflow = %name, "Run submitted");

    let result = state
        .worker()
        .run(&run_id, body.input())
        .await
        .map_err(worker_error)?;

    Ok(Json(RunResponse { run_id, result }))
}

/// Recorded history of a run
pub async fn run_history(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let entries = state.worker().history(&run_id).map_err(worker_error)?;
    if entries.is_empty() {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Run not found: {}", run_id),
            true,
        ));
    }
    Ok(Json(HistoryResponse { run_id, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_splits_run_id_from_params() {
        let body: SubmitRunBody =
            serde_json::from_value(json!({"runId": "r1", "relativePath": "transfer"})).unwrap();
        assert_eq!(body.run_id.as_deref(), Some("r1"));
        assert_eq!(body.input(), json!({"relativePath": "transfer"}));
    }

    #[test]
    fn test_empty_body_is_null_input() {
        let body: SubmitRunBody = serde_json::from_value(json!({})).unwrap();
        assert!(body.run_id.is_none());
        assert_eq!(body.input(), Value::Null);
    }

    #[test]
    fn test_error_status_mapping() {
        let (status, Json(body)) = worker_error(WorkerError::Closed);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.non_retryable);

        let (status, Json(body)) = worker_error(WorkerError::AlreadyRunning("r".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.non_retryable);
    }
}
