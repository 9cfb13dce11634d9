//! Types for the preprocessing workflow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eventlog::EventLog;

/// Summary outcome of a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Success,
    SystemError,
    /// Reserved for content validation; no step produces it yet.
    ContentError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SystemError => "system_error",
            Self::ContentError => "content_error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of a preprocessing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingParams {
    /// Transfer directory, relative to the shared path.
    #[serde(alias = "relativePath")]
    pub relative_path: String,
}

impl PreprocessingParams {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

/// Output of a preprocessing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingResult {
    pub outcome: Outcome,
    pub relative_path: String,
    pub preservation_tasks: EventLog,
}

/// Errors that abort a run without producing a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The caller passed malformed parameters.
    #[error("error calling workflow with unexpected inputs: {reason}")]
    InvalidInput { reason: String },
}

impl WorkflowError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether the scheduling layer may retry the run.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidInput { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_accept_camel_case_alias() {
        let params: PreprocessingParams =
            serde_json::from_str(r#"{"relativePath": "transfer"}"#).unwrap();
        assert_eq!(params.relative_path, "transfer");

        let params: PreprocessingParams =
            serde_json::from_str(r#"{"relative_path": "transfer"}"#).unwrap();
        assert_eq!(params, PreprocessingParams::new("transfer"));
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&Outcome::SystemError).unwrap(),
            "\"system_error\""
        );
        let parsed: Outcome = serde_json::from_str("\"content_error\"").unwrap();
        assert_eq!(parsed, Outcome::ContentError);
    }

    #[test]
    fn test_invalid_input_is_not_retryable() {
        let err = WorkflowError::invalid_input("relative path is empty");
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "error calling workflow with unexpected inputs: relative path is empty"
        );
    }
}
