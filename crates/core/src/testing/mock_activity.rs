//! Mock activity for testing the runtime.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::runtime::ActivityHandler;
use crate::workflow::ActivityError;

/// Scripted [`ActivityHandler`].
///
/// Responses are consumed in push order; once exhausted every call fails.
/// Clones share responses and counters, so a clone can be registered while
/// the original is kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockActivity {
    responses: Arc<RwLock<VecDeque<Result<Value, ActivityError>>>>,
    inputs: Arc<RwLock<Vec<Value>>>,
    calls: Arc<AtomicUsize>,
    in_progress: Arc<AtomicUsize>,
    peak_in_progress: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: Result<Value, ActivityError>) {
        self.responses.write().unwrap().push_back(response);
    }

    /// Queue a successful response serialized from `output`.
    pub fn push_json<T: Serialize>(&self, output: &T) {
        let response = serde_json::to_value(output).map_err(ActivityError::payload);
        self.push_response(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_progress.load(Ordering::SeqCst)
    }

    pub fn recorded_inputs(&self) -> Vec<Value> {
        self.inputs.read().unwrap().clone()
    }
}

#[async_trait]
impl ActivityHandler for MockActivity {
    async fn handle(&self, input: Value) -> Result<Value, ActivityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.write().unwrap().push(input);

        let running = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_progress.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_progress.fetch_sub(1, Ordering::SeqCst);

        let next = self.responses.write().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ActivityError::failed("no scripted response")))
    }
}
