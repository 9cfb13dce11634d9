//! Common test utilities for in-process API testing.
//!
//! Builds the router around a real worker whose shared path is a temporary
//! directory, so runs bag real transfers.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use preprocessing_core::{
    runtime::{ActivityRegistry, InMemoryHistoryStore},
    BagCreateActivity, ChecksumAlgorithm, Configuration, PreprocessingWorkflow, Worker,
};
use preprocessing_worker::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use preprocessing_core::testing::fixtures;

pub const WORKFLOW_NAME: &str = "preprocessing";

/// In-process worker API backed by a temporary shared path.
pub struct TestFixture {
    pub router: Router,
    pub worker: Arc<Worker>,
    pub shared_path: PathBuf,
    _temp_dir: TempDir,
}

/// Response from the test server.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let shared_path = temp_dir.path().to_path_buf();

        let mut config = Configuration::default();
        config.shared_path = shared_path.display().to_string();
        config.temporal.task_queue = "preprocessing".to_string();
        config.temporal.workflow_name = WORKFLOW_NAME.to_string();

        let mut registry = ActivityRegistry::new();
        registry.register(BagCreateActivity::new(ChecksumAlgorithm::Sha256));
        let worker = Arc::new(Worker::new(
            PreprocessingWorkflow::new(&shared_path),
            registry,
            Arc::new(InMemoryHistoryStore::new()),
            1,
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&worker)));
        let router = create_router(state);

        Self {
            router,
            worker,
            shared_path,
            _temp_dir: temp_dir,
        }
    }

    /// Create a transfer under the shared path and return its name.
    pub fn transfer(&self, name: &str) -> String {
        fixtures::write_transfer(&self.shared_path, name).expect("Failed to write transfer");
        name.to_string()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}
