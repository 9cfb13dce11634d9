use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
///
/// Keys use the camelCase names of the on-disk TOML format.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Configuration {
    pub debug: bool,
    pub verbosity: i32,
    #[serde(rename = "sharedPath")]
    pub shared_path: String,
    pub temporal: TemporalConfig,
    pub worker: WorkerConfig,
    pub bagit: BagitConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            debug: false,
            verbosity: 0,
            shared_path: String::new(),
            temporal: TemporalConfig::default(),
            worker: WorkerConfig::default(),
            bagit: BagitConfig::default(),
        }
    }
}

/// Addressing for the scheduling substrate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Host and port of the orchestration endpoint (default: "localhost:7233").
    pub address: String,
    /// Namespace the worker runs in (default: "default").
    pub namespace: String,
    /// Task queue the worker pulls runs from.
    #[serde(rename = "taskQueue")]
    pub task_queue: String,
    /// Name the preprocessing workflow is registered under.
    #[serde(rename = "workflowName")]
    pub workflow_name: String,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            namespace: default_namespace(),
            task_queue: String::new(),
            workflow_name: String::new(),
        }
    }
}

fn default_address() -> String {
    "localhost:7233".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Worker process settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of runs handled simultaneously (default: 1).
    ///
    /// Signed so that out-of-range values reach validation instead of
    /// failing deserialization.
    #[serde(rename = "maxConcurrentSessions")]
    pub max_concurrent_sessions: i64,
    /// SQLite file holding run history. In-memory history when unset.
    #[serde(rename = "historyPath", skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 1,
            history_path: None,
        }
    }
}

/// Packaging options handed to the bag creation activity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BagitConfig {
    /// Manifest checksum algorithm. Kept as text until validation so that an
    /// unknown value is reported alongside every other violation.
    #[serde(rename = "checksumAlgorithm", skip_serializing_if = "Option::is_none")]
    pub checksum_algorithm: Option<String>,
}

impl BagitConfig {
    /// Parsed algorithm, `None` when unset or not one of the allowed values.
    pub fn algorithm(&self) -> Option<ChecksumAlgorithm> {
        self.checksum_algorithm
            .as_deref()
            .and_then(ChecksumAlgorithm::parse)
    }
}

/// Checksum algorithms a bag manifest may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    pub const ALL: [ChecksumAlgorithm; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.as_str() == value)
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
