use std::fmt;

use super::types::{ChecksumAlgorithm, Configuration};

/// Why a single configuration field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorReason {
    MissingRequired,
    BelowMinimum { value: i64, minimum: i64 },
    InvalidEnum { value: String, allowed: Vec<String> },
}

/// A rejected configuration field, addressed by its config key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: FieldErrorReason,
}

impl FieldError {
    fn new(field: &str, reason: FieldErrorReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FieldErrorReason::MissingRequired => {
                write!(f, "{}: missing required value", self.field)
            }
            FieldErrorReason::BelowMinimum { value, minimum } => write!(
                f,
                "{}: {} is less than the minimum value ({})",
                self.field, value, minimum
            ),
            FieldErrorReason::InvalidEnum { value, allowed } => write!(
                f,
                "{}: invalid value \"{}\", must be one of ({})",
                self.field,
                value,
                allowed.join(", ")
            ),
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration:")?;
        for err in &self.0 {
            write!(f, "\n{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate configuration.
///
/// All rules run; violations are collected in rule order rather than
/// returned at the first failure.
pub fn validate_config(config: &Configuration) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    required(&mut errors, "sharedPath", &config.shared_path);
    required(&mut errors, "temporal.taskQueue", &config.temporal.task_queue);
    required(
        &mut errors,
        "temporal.workflowName",
        &config.temporal.workflow_name,
    );
    at_least(
        &mut errors,
        "worker.maxConcurrentSessions",
        config.worker.max_concurrent_sessions,
        1,
    );
    if let Some(value) = &config.bagit.checksum_algorithm {
        one_of(
            &mut errors,
            "bagit.checksumAlgorithm",
            value,
            &ChecksumAlgorithm::ALL.map(|alg| alg.as_str()),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(FieldError::new(field, FieldErrorReason::MissingRequired));
    }
}

fn at_least(errors: &mut Vec<FieldError>, field: &str, value: i64, minimum: i64) {
    if value < minimum {
        errors.push(FieldError::new(
            field,
            FieldErrorReason::BelowMinimum { value, minimum },
        ));
    }
}

fn one_of(errors: &mut Vec<FieldError>, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        errors.push(FieldError::new(
            field,
            FieldErrorReason::InvalidEnum {
                value: value.to_string(),
                allowed: allowed.iter().map(|s| s.to_string()).collect(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BagitConfig, TemporalConfig, WorkerConfig};

    fn valid_config() -> Configuration {
        Configuration {
            shared_path: "/home/preprocessing/shared".to_string(),
            temporal: TemporalConfig {
                task_queue: "preprocessing".to_string(),
                workflow_name: "preprocessing".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_required_fields_are_aggregated() {
        let err = validate_config(&Configuration::default()).unwrap_err();
        assert_eq!(err.len(), 3);

        let mut fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
        fields.sort();
        assert_eq!(
            fields,
            vec!["sharedPath", "temporal.taskQueue", "temporal.workflowName"]
        );
        assert!(err
            .errors()
            .iter()
            .all(|e| e.reason == FieldErrorReason::MissingRequired));

        assert_eq!(
            err.to_string(),
            "invalid configuration:\n\
             sharedPath: missing required value\n\
             temporal.taskQueue: missing required value\n\
             temporal.workflowName: missing required value"
        );
    }

    #[test]
    fn test_max_concurrent_sessions_below_minimum() {
        let config = Configuration {
            worker: WorkerConfig {
                max_concurrent_sessions: -1,
                ..Default::default()
            },
            ..valid_config()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.errors(),
            &[FieldError {
                field: "worker.maxConcurrentSessions".to_string(),
                reason: FieldErrorReason::BelowMinimum {
                    value: -1,
                    minimum: 1
                },
            }]
        );
        assert_eq!(
            err.to_string(),
            "invalid configuration:\nworker.maxConcurrentSessions: -1 is less than the minimum value (1)"
        );
    }

    #[test]
    fn test_zero_sessions_rejected() {
        let config = Configuration {
            worker: WorkerConfig {
                max_concurrent_sessions: 0,
                ..Default::default()
            },
            ..valid_config()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_checksum_algorithm() {
        let config = Configuration {
            bagit: BagitConfig {
                checksum_algorithm: Some("unknown".to_string()),
            },
            ..valid_config()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.len(), 1);
        match &err.errors()[0].reason {
            FieldErrorReason::InvalidEnum { value, allowed } => {
                assert_eq!(value, "unknown");
                assert_eq!(allowed, &["md5", "sha1", "sha256", "sha512"]);
            }
            other => panic!("unexpected reason: {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "invalid configuration:\nbagit.checksumAlgorithm: invalid value \"unknown\", must be one of (md5, sha1, sha256, sha512)"
        );
    }

    #[test]
    fn test_every_violation_reported_together() {
        let config = Configuration {
            worker: WorkerConfig {
                max_concurrent_sessions: 0,
                ..Default::default()
            },
            bagit: BagitConfig {
                checksum_algorithm: Some("crc32".to_string()),
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.len(), 5);
    }
}
