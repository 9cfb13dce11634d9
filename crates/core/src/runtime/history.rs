//! Recorded run history.
//!
//! Every non-deterministic input a run observes (time, activity results,
//! timers) is appended here before the workflow sees it. Replaying a run
//! feeds the same inputs back in order instead of producing new ones.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::workflow::{ActivityError, Outcome};

/// A single recorded fact about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    RunStarted { params: Value },
    TimeRecorded { at: DateTime<Utc> },
    ActivityCompleted { name: String, output: Value },
    ActivityFailed { name: String, error: ActivityError },
    TimerFired { deadline: DateTime<Utc> },
    RunCompleted { outcome: Outcome },
    RunRejected { reason: String },
}

impl HistoryEvent {
    /// Whether the event closes the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted { .. } | Self::RunRejected { .. })
    }

    /// Whether the event is an input replayed back into the workflow.
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Self::TimeRecorded { .. }
                | Self::ActivityCompleted { .. }
                | Self::ActivityFailed { .. }
                | Self::TimerFired { .. }
        )
    }
}

/// A history event with its position in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub seq: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: HistoryEvent,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Append-only storage for run histories.
pub trait HistoryStore: Send + Sync {
    /// All entries of `run_id` in sequence order. Unknown runs are empty.
    fn load(&self, run_id: &str) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Append an event and return its sequence number.
    fn append(
        &self,
        run_id: &str,
        recorded_at: DateTime<Utc>,
        event: &HistoryEvent,
    ) -> Result<u64, HistoryError>;
}

/// Process-local history store.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    runs: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self, run_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let runs = self.runs.read().unwrap();
        Ok(runs.get(run_id).cloned().unwrap_or_default())
    }

    fn append(
        &self,
        run_id: &str,
        recorded_at: DateTime<Utc>,
        event: &HistoryEvent,
    ) -> Result<u64, HistoryError> {
        let mut runs = self.runs.write().unwrap();
        let entries = runs.entry(run_id.to_string()).or_default();
        let seq = entries.len() as u64 + 1;
        entries.push(HistoryEntry {
            seq,
            recorded_at,
            event: event.clone(),
        });
        Ok(seq)
    }
}
