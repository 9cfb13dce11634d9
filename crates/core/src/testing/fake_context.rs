//! Fake workflow context for testing workflow logic.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::workflow::{ActivityError, ActivityOptions, WorkflowContext};

use super::fixtures;

/// An activity call made through the fake context.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub name: String,
    pub options: ActivityOptions,
    pub input: Value,
}

/// [`WorkflowContext`] with a frozen clock and scripted activity responses.
///
/// Each activity name answers with the response set for it, on every call.
/// Names without a response fail with [`ActivityError::NotRegistered`].
/// Timers fire immediately.
#[derive(Debug, Clone)]
pub struct FakeWorkflowContext {
    now: DateTime<Utc>,
    responses: Arc<RwLock<HashMap<String, Result<Value, ActivityError>>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    timers: Arc<RwLock<Vec<DateTime<Utc>>>>,
}

impl Default for FakeWorkflowContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorkflowContext {
    /// Create a fake context frozen at [`fixtures::fixed_time`].
    pub fn new() -> Self {
        Self::at(fixtures::fixed_time())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            responses: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            timers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answer calls to `name` with `response`, serialized to JSON.
    pub fn set_response<T: Serialize>(&self, name: &str, response: Result<T, ActivityError>) {
        let response =
            response.and_then(|v| serde_json::to_value(v).map_err(ActivityError::payload));
        self.set_raw_response(name, response);
    }

    pub fn set_error(&self, name: &str, error: ActivityError) {
        self.set_raw_response(name, Err(error));
    }

    pub fn set_raw_response(&self, name: &str, response: Result<Value, ActivityError>) {
        self.responses
            .write()
            .unwrap()
            .insert(name.to_string(), response);
    }

    /// Get all activity calls in the order they were made.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().unwrap().clone()
    }

    /// Deadlines passed to `sleep_until`.
    pub fn recorded_timers(&self) -> Vec<DateTime<Utc>> {
        self.timers.read().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowContext for FakeWorkflowContext {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    async fn execute_activity(
        &self,
        name: &str,
        options: &ActivityOptions,
        input: Value,
    ) -> Result<Value, ActivityError> {
        self.calls.write().unwrap().push(RecordedCall {
            name: name.to_string(),
            options: *options,
            input,
        });

        let response = self.responses.read().unwrap().get(name).cloned();
        response.unwrap_or_else(|| {
            Err(ActivityError::NotRegistered {
                name: name.to_string(),
            })
        })
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        self.timers.write().unwrap().push(deadline);
    }
}
