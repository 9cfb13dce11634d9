//! Session-bounded workflow worker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::workflow::{
    Outcome, PreprocessingParams, PreprocessingResult, PreprocessingWorkflow, WorkflowError,
};

use super::activity::ActivityRegistry;
use super::clock::{Clock, SystemClock};
use super::context::{ContextFailure, LocalWorkflowContext};
use super::history::{HistoryEntry, HistoryError, HistoryEvent, HistoryStore};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("nondeterministic replay of run {run_id}: {detail}")]
    Nondeterminism { run_id: String, detail: String },

    #[error("run {0} is already in progress")]
    AlreadyRunning(String),

    #[error("worker is shut down")]
    Closed,
}

impl WorkerError {
    /// Whether resubmitting the run may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Workflow(e) => e.is_retryable(),
            Self::History(_) | Self::AlreadyRunning(_) => true,
            Self::Nondeterminism { .. } | Self::Closed => false,
        }
    }
}

/// Snapshot of worker load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub activities: Vec<String>,
    pub closed: bool,
}

/// Executes preprocessing runs, at most `max_sessions` at a time.
pub struct Worker {
    workflow: PreprocessingWorkflow,
    registry: Arc<ActivityRegistry>,
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    sessions: Semaphore,
    max_sessions: usize,
    active: AtomicUsize,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases a run id and its session slot.
struct ActiveRun<'a> {
    worker: &'a Worker,
    run_id: String,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.worker.active.fetch_sub(1, Ordering::SeqCst);
        self.worker.in_flight.lock().unwrap().remove(&self.run_id);
    }
}

impl Worker {
    /// `max_sessions` below 1 is treated as 1.
    pub fn new(
        workflow: PreprocessingWorkflow,
        registry: ActivityRegistry,
        history: Arc<dyn HistoryStore>,
        max_sessions: usize,
    ) -> Self {
        let max_sessions = max_sessions.max(1);
        Self {
            workflow,
            registry: Arc::new(registry),
            history,
            clock: Arc::new(SystemClock),
            sessions: Semaphore::new(max_sessions),
            max_sessions,
            active: AtomicUsize::new(0),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn workflow(&self) -> &PreprocessingWorkflow {
        &self.workflow
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            active_sessions: self.active.load(Ordering::SeqCst),
            max_sessions: self.max_sessions,
            activities: self.registry.names(),
            closed: self.sessions.is_closed(),
        }
    }

    /// Recorded history of `run_id`, empty if the run is unknown.
    pub fn history(&self, run_id: &str) -> Result<Vec<HistoryEntry>, WorkerError> {
        Ok(self.history.load(run_id)?)
    }

    /// Stop accepting runs. Runs already holding a session finish normally.
    pub fn shutdown(&self) {
        info!("Worker shutting down");
        self.sessions.close();
    }

    /// Execute run `run_id` with raw JSON `input`.
    ///
    /// A run id with recorded history is replayed: recorded activity results
    /// are reused and the original input wins over `input`.
    pub async fn run(
        &self,
        run_id: &str,
        input: Value,
    ) -> Result<PreprocessingResult, WorkerError> {
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| WorkerError::Closed)?;
        let _active = self.claim(run_id)?;

        let started = Instant::now();
        let recorded = self.history.load(run_id)?;
        let input = match recorded.first().map(|e| &e.event) {
            None => {
                self.history.append(
                    run_id,
                    self.clock.now(),
                    &HistoryEvent::RunStarted {
                        params: input.clone(),
                    },
                )?;
                input
            }
            Some(HistoryEvent::RunStarted { params }) => {
                if *params != input {
                    debug!(run_id, "Ignoring new input for recorded run");
                }
                params.clone()
            }
            Some(other) => {
                return Err(WorkerError::Nondeterminism {
                    run_id: run_id.to_string(),
                    detail: format!("history does not start with run_started: {:?}", other),
                })
            }
        };
        let terminal = recorded
            .iter()
            .find(|e| e.event.is_terminal())
            .map(|e| e.event.clone());
        let replayed = terminal.is_some();

        info!(run_id, replayed, "Starting run");

        let ctx = LocalWorkflowContext::new(
            run_id,
            recorded.into_iter().map(|e| e.event),
            Arc::clone(&self.registry),
            Arc::clone(&self.history),
            Arc::clone(&self.clock),
        );
        let result = match parse_params(&input) {
            Ok(params) => self.workflow.execute(&ctx, params).await,
            Err(e) => Err(e),
        };
        ctx.finish().map_err(|failure| match failure {
            ContextFailure::History(e) => WorkerError::History(e),
            ContextFailure::Nondeterminism(detail) => WorkerError::Nondeterminism {
                run_id: run_id.to_string(),
                detail,
            },
        })?;

        let closing = match &result {
            Ok(r) => HistoryEvent::RunCompleted { outcome: r.outcome },
            Err(WorkflowError::InvalidInput { reason }) => HistoryEvent::RunRejected {
                reason: reason.clone(),
            },
        };
        match terminal {
            Some(recorded) if recorded != closing => {
                return Err(WorkerError::Nondeterminism {
                    run_id: run_id.to_string(),
                    detail: format!("run closed with {:?}, history has {:?}", closing, recorded),
                });
            }
            Some(_) => {
                metrics::RUNS_REPLAYED.inc();
                info!(run_id, "Run replayed from history");
                return result.map_err(WorkerError::from);
            }
            None => {
                self.history.append(run_id, self.clock.now(), &closing)?;
            }
        }

        match &result {
            Ok(r) => {
                let outcome = r.outcome.as_str();
                metrics::RUNS_TOTAL.with_label_values(&[outcome]).inc();
                metrics::RUN_DURATION
                    .with_label_values(&[outcome])
                    .observe(started.elapsed().as_secs_f64());
                if r.outcome == Outcome::Success {
                    info!(run_id, "Run completed");
                } else {
                    warn!(run_id, outcome, "Run completed with failure");
                }
            }
            Err(e) => {
                metrics::RUNS_REJECTED.inc();
                warn!(run_id, error = %e, "Run rejected");
            }
        }

        result.map_err(WorkerError::from)
    }

    fn claim(&self, run_id: &str) -> Result<ActiveRun<'_>, WorkerError> {
        if !self.in_flight.lock().unwrap().insert(run_id.to_string()) {
            return Err(WorkerError::AlreadyRunning(run_id.to_string()));
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(ActiveRun {
            worker: self,
            run_id: run_id.to_string(),
        })
    }
}

/// `null` means no parameters were supplied.
fn parse_params(input: &Value) -> Result<Option<PreprocessingParams>, WorkflowError> {
    if input.is_null() {
        return Ok(None);
    }
    serde_json::from_value(input.clone())
        .map(Some)
        .map_err(|e| WorkflowError::invalid_input(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bagcreate;
    use crate::runtime::InMemoryHistoryStore;
    use crate::testing::{fixtures, ManualClock, MockActivity};
    use serde_json::json;

    fn worker(activity: &MockActivity, max_sessions: usize) -> (Worker, Arc<InMemoryHistoryStore>) {
        let mut registry = ActivityRegistry::new();
        registry.register_handler(bagcreate::NAME, Arc::new(activity.clone()));
        let history = Arc::new(InMemoryHistoryStore::new());
        let worker = Worker::new(
            PreprocessingWorkflow::new("/shared"),
            registry,
            history.clone(),
            max_sessions,
        )
        .with_clock(Arc::new(ManualClock::default()));
        (worker, history)
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(parse_params(&Value::Null).unwrap(), None);
        assert_eq!(
            parse_params(&json!({"relative_path": "t"})).unwrap(),
            Some(PreprocessingParams::new("t"))
        );
        assert!(parse_params(&json!({"other": 1})).is_err());
        assert!(parse_params(&json!("transfer")).is_err());
    }

    #[tokio::test]
    async fn test_run_records_history_and_closes() {
        let activity = MockActivity::new();
        activity.push_json(&fixtures::bag_result(std::path::Path::new("/shared/t")));
        let (worker, history) = worker(&activity, 1);

        let result = worker
            .run("run-1", json!({"relative_path": "t"}))
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Success);

        let events: Vec<_> = history
            .load("run-1")
            .unwrap()
            .into_iter()
            .map(|e| e.event)
            .collect();
        assert!(matches!(events.first(), Some(HistoryEvent::RunStarted { .. })));
        assert_eq!(
            events.last(),
            Some(&HistoryEvent::RunCompleted {
                outcome: Outcome::Success
            })
        );
        assert_eq!(worker.status().active_sessions, 0);
    }

    #[tokio::test]
    async fn test_rerun_replays_without_activity() {
        let activity = MockActivity::new();
        activity.push_json(&fixtures::bag_result(std::path::Path::new("/shared/t")));
        let (worker, _) = worker(&activity, 1);

        let first = worker
            .run("run-1", json!({"relative_path": "t"}))
            .await
            .unwrap();
        let second = worker
            .run("run-1", json!({"relative_path": "ignored"}))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(activity.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_input() {
        let activity = MockActivity::new();
        let (worker, history) = worker(&activity, 1);

        let err = worker.run("run-1", Value::Null).await.unwrap_err();
        assert!(matches!(err, WorkerError::Workflow(_)));
        assert!(!err.is_retryable());
        assert_eq!(activity.call_count(), 0);

        let last = history.load("run-1").unwrap().pop().unwrap();
        assert!(matches!(last.event, HistoryEvent::RunRejected { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_runs() {
        let activity = MockActivity::new();
        let (worker, _) = worker(&activity, 1);

        worker.shutdown();
        let err = worker
            .run("run-1", json!({"relative_path": "t"}))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Closed));
        assert!(worker.status().closed);
    }

    #[test]
    fn test_zero_sessions_clamped() {
        let activity = MockActivity::new();
        let (worker, _) = worker(&activity, 0);
        assert_eq!(worker.status().max_sessions, 1);
    }
}
