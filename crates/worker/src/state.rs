use std::sync::Arc;

use preprocessing_core::{Configuration, Worker};

/// Shared application state
pub struct AppState {
    config: Configuration,
    worker: Arc<Worker>,
}

impl AppState {
    pub fn new(config: Configuration, worker: Arc<Worker>) -> Self {
        Self { config, worker }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn worker(&self) -> &Worker {
        self.worker.as_ref()
    }

    /// Whether `name` is the workflow this worker serves.
    pub fn serves_workflow(&self, name: &str) -> bool {
        self.config.temporal.workflow_name == name
    }
}
