//! Preprocessing workflow and the scheduling interface it runs against.
//!
//! The workflow never touches the filesystem or the wall clock itself. It
//! drives its single step through a [`WorkflowContext`], which the local
//! runtime (or a test fake) supplies.

mod context;
mod preprocessing;
mod types;

pub use context::{execute_activity, ActivityError, ActivityOptions, RetryPolicy, WorkflowContext};
pub use preprocessing::{bag_create_options, PreprocessingWorkflow, BAG_CREATE_TIMEOUT, BAG_SIP_EVENT};
pub use types::{Outcome, PreprocessingParams, PreprocessingResult, WorkflowError};
