//! The preprocessing workflow.
//!
//! A run validates its parameters, then bags the transfer through the
//! bag creation activity and records the step in the run's event log:
//!
//! ```text
//! Start --invalid params--> InputRejected (Err, no events)
//!   |
//!   v
//! BagCreation --ok--> Done(Success)
//!             --err-> Done(SystemError)
//! ```
//!
//! Step failures are data: they complete the step's event with a failure
//! outcome and the run still returns `Ok`.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error};

use crate::bagcreate::{self, BagCreateParams, BagCreateResult};
use crate::eventlog::{EventHandle, EventOutcome};

use super::context::{execute_activity, ActivityOptions, RetryPolicy, WorkflowContext};
use super::types::{Outcome, PreprocessingParams, PreprocessingResult, WorkflowError};

/// Name of the event recorded for the bagging step.
pub const BAG_SIP_EVENT: &str = "Bag SIP";

/// Schedule-to-close timeout for the bag creation activity.
pub const BAG_CREATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

impl PreprocessingResult {
    fn new_event(&mut self, ctx: &dyn WorkflowContext, name: &str) -> EventHandle {
        self.preservation_tasks.start(ctx.now(), name)
    }

    /// Complete `event` as a system failure and mark the run as failed.
    fn system_error(
        mut self,
        ctx: &dyn WorkflowContext,
        err: &dyn fmt::Display,
        event: EventHandle,
        msg: &str,
    ) -> Self {
        error!(message = %err, "System error");

        self.preservation_tasks.complete(
            event,
            ctx.now(),
            EventOutcome::SystemFailure,
            format_args!("System error: {}", msg),
        );
        self.outcome = Outcome::SystemError;
        self
    }
}

/// Turns a received transfer into a bag under the shared path.
#[derive(Debug, Clone)]
pub struct PreprocessingWorkflow {
    shared_path: PathBuf,
}

impl PreprocessingWorkflow {
    pub fn new(shared_path: impl Into<PathBuf>) -> Self {
        Self {
            shared_path: shared_path.into(),
        }
    }

    pub fn shared_path(&self) -> &Path {
        &self.shared_path
    }

    /// `relative_path` under the shared path.
    ///
    /// Root and prefix components are dropped, so an absolute path still
    /// resolves inside the shared path.
    pub fn source_path(&self, relative_path: &str) -> PathBuf {
        let mut path = self.shared_path.clone();
        for component in Path::new(relative_path).components() {
            match component {
                Component::Normal(_) | Component::CurDir | Component::ParentDir => {
                    path.push(component)
                }
                Component::RootDir | Component::Prefix(_) => {}
            }
        }
        path
    }

    /// Execute one run.
    ///
    /// Returns `Err` only for malformed parameters, which the scheduling
    /// layer must not retry. Every other failure is reported through the
    /// result's outcome and event log.
    pub async fn execute(
        &self,
        ctx: &dyn WorkflowContext,
        params: Option<PreprocessingParams>,
    ) -> Result<PreprocessingResult, WorkflowError> {
        debug!(params = ?params, "PreprocessingWorkflow running");

        let params = match params {
            Some(p) if !p.relative_path.is_empty() => p,
            Some(_) => return Err(WorkflowError::invalid_input("relative path is empty")),
            None => return Err(WorkflowError::invalid_input("missing parameters")),
        };

        let mut result = PreprocessingResult {
            relative_path: params.relative_path.clone(),
            ..Default::default()
        };

        // Bag the SIP for downstream processing.
        let event = result.new_event(ctx, BAG_SIP_EVENT);
        let request = BagCreateParams {
            source_path: self.source_path(&params.relative_path),
        };
        let bagged: Result<BagCreateResult, _> =
            execute_activity(ctx, bagcreate::NAME, &bag_create_options(), &request).await;
        if let Err(e) = bagged {
            return Ok(result.system_error(ctx, &e, event, "bagging has failed"));
        }
        result
            .preservation_tasks
            .succeed(event, ctx.now(), "SIP has been bagged");

        Ok(result)
    }
}

/// Single attempt, five minute schedule-to-close.
pub fn bag_create_options() -> ActivityOptions {
    ActivityOptions {
        schedule_to_close_timeout: BAG_CREATE_TIMEOUT,
        retry_policy: RetryPolicy {
            maximum_attempts: 1,
        },
    }
}
