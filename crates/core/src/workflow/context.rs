//! Abstract scheduling capability consumed by workflows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Retry behaviour for an activity call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub maximum_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            maximum_attempts: 1,
        }
    }
}

/// Options applied by the substrate to a single activity call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityOptions {
    /// Upper bound on the call, across every attempt.
    pub schedule_to_close_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

/// Failure of an activity call as seen by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityError {
    /// The activity ran and returned an error.
    #[error("{message}")]
    Failed { message: String },

    /// The schedule-to-close timeout elapsed.
    #[error("activity timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("activity cancelled")]
    Cancelled,

    #[error("no activity registered under name: {name}")]
    NotRegistered { name: String },

    /// Request or response could not be (de)serialized.
    #[error("invalid activity payload: {reason}")]
    Payload { reason: String },
}

impl ActivityError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn payload(reason: impl ToString) -> Self {
        Self::Payload {
            reason: reason.to_string(),
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Deterministic execution context handed to a workflow run.
///
/// Workflows must take every timestamp from [`WorkflowContext::now`] and
/// perform every side effect through [`WorkflowContext::execute_activity`], so
/// that the substrate can replay a run from its recorded history.
#[async_trait]
pub trait WorkflowContext: Send + Sync {
    /// Current workflow time.
    fn now(&self) -> DateTime<Utc>;

    /// Run the named activity and wait for its result.
    async fn execute_activity(
        &self,
        name: &str,
        options: &ActivityOptions,
        input: Value,
    ) -> Result<Value, ActivityError>;

    /// Suspend the run until workflow time reaches `deadline`.
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// Typed wrapper around [`WorkflowContext::execute_activity`].
pub async fn execute_activity<P, O>(
    ctx: &dyn WorkflowContext,
    name: &str,
    options: &ActivityOptions,
    params: &P,
) -> Result<O, ActivityError>
where
    P: Serialize + ?Sized,
    O: DeserializeOwned,
{
    let input = serde_json::to_value(params).map_err(ActivityError::payload)?;
    let output = ctx.execute_activity(name, options, input).await?;
    serde_json::from_value(output).map_err(ActivityError::payload)
}
