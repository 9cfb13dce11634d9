//! Replaying workflow context.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::metrics;
use crate::workflow::{ActivityError, ActivityOptions, WorkflowContext};

use super::activity::{ActivityHandler, ActivityRegistry};
use super::clock::Clock;
use super::history::{HistoryError, HistoryEvent, HistoryStore};

/// Delay before the second attempt of a retryable activity; doubles after.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Why a run could not be trusted after it finished.
#[derive(Debug)]
pub enum ContextFailure {
    /// A history write failed, the recorded history is incomplete.
    History(HistoryError),
    /// The workflow asked for something other than what history recorded.
    Nondeterminism(String),
}

#[derive(Debug)]
struct ReplayState {
    pending: VecDeque<HistoryEvent>,
    failure: Option<ContextFailure>,
    /// Latest time handed to the workflow; live time never goes below it.
    latest: Option<DateTime<Utc>>,
}

/// [`WorkflowContext`] for one run of the local runtime.
///
/// Recorded command events are consumed in order before anything is done
/// live. Once they are exhausted every new input is appended to the history
/// store, so a later run with the same id replays the same inputs.
pub struct LocalWorkflowContext {
    run_id: String,
    registry: Arc<ActivityRegistry>,
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<ReplayState>,
}

impl LocalWorkflowContext {
    /// `recorded` is the run's existing history; non-command events are skipped.
    pub fn new(
        run_id: impl Into<String>,
        recorded: impl IntoIterator<Item = HistoryEvent>,
        registry: Arc<ActivityRegistry>,
        history: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pending = recorded.into_iter().filter(|e| e.is_command()).collect();
        Self {
            run_id: run_id.into(),
            registry,
            history,
            clock,
            state: Mutex::new(ReplayState {
                pending,
                failure: None,
                latest: None,
            }),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Whether recorded inputs remain to be replayed.
    pub fn is_replaying(&self) -> bool {
        !self.state.lock().unwrap().pending.is_empty()
    }

    /// Consume the context, reporting the first failure seen during the run.
    ///
    /// Recorded inputs the workflow never asked for count as nondeterminism.
    pub fn finish(self) -> Result<(), ContextFailure> {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        if let Some(failure) = state.failure {
            return Err(failure);
        }
        if let Some(next) = state.pending.front() {
            return Err(ContextFailure::Nondeterminism(format!(
                "{} recorded events were not replayed, next: {:?}",
                state.pending.len(),
                next
            )));
        }
        Ok(())
    }

    /// Pop the next recorded input, or `None` once live.
    fn next_recorded(&self) -> Option<HistoryEvent> {
        self.state.lock().unwrap().pending.pop_front()
    }

    /// Remember `at` as handed out and return the time the workflow sees.
    fn observe(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let mut state = self.state.lock().unwrap();
        let at = state.latest.map_or(at, |latest| latest.max(at));
        state.latest = Some(at);
        at
    }

    fn fail(&self, failure: ContextFailure) {
        let mut state = self.state.lock().unwrap();
        if state.failure.is_none() {
            state.failure = Some(failure);
        }
    }

    fn nondeterminism(&self, expected: &str, found: &HistoryEvent) {
        warn!(run_id = %self.run_id, expected, found = ?found, "Replay diverged from history");
        self.fail(ContextFailure::Nondeterminism(format!(
            "expected {}, history has {:?}",
            expected, found
        )));
    }

    fn record(&self, event: HistoryEvent) {
        if let Err(e) = self.history.append(&self.run_id, self.clock.now(), &event) {
            warn!(run_id = %self.run_id, error = %e, "Failed to record history");
            self.fail(ContextFailure::History(e));
        }
    }

    async fn run_attempts(
        &self,
        name: &str,
        handler: &dyn ActivityHandler,
        options: &ActivityOptions,
        input: Value,
    ) -> Result<Value, ActivityError> {
        let max_attempts = options.retry_policy.maximum_attempts.max(1);
        let mut delay = RETRY_INTERVAL;
        let mut attempt = 1;
        loop {
            metrics::ACTIVITY_ATTEMPTS.with_label_values(&[name]).inc();
            match handler.handle(input.clone()).await {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(activity = name, attempt, error = %e, "Activity attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn run_live(
        &self,
        name: &str,
        options: &ActivityOptions,
        input: Value,
    ) -> Result<Value, ActivityError> {
        let Some(handler) = self.registry.get(name) else {
            return Err(ActivityError::NotRegistered {
                name: name.to_string(),
            });
        };

        let timeout = options.schedule_to_close_timeout;
        let started = Instant::now();
        let result = match tokio::time::timeout(
            timeout,
            self.run_attempts(name, handler.as_ref(), options, input),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                metrics::ACTIVITY_TIMEOUTS.with_label_values(&[name]).inc();
                Err(ActivityError::Timeout {
                    after_ms: timeout.as_millis() as u64,
                })
            }
        };

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::ACTIVITY_DURATION
            .with_label_values(&[name, status])
            .observe(started.elapsed().as_secs_f64());

        result
    }
}

#[async_trait]
impl WorkflowContext for LocalWorkflowContext {
    fn now(&self) -> DateTime<Utc> {
        match self.next_recorded() {
            Some(HistoryEvent::TimeRecorded { at }) => self.observe(at),
            Some(other) => {
                self.nondeterminism("time_recorded", &other);
                self.observe(self.clock.now())
            }
            None => {
                let at = self.observe(self.clock.now());
                self.record(HistoryEvent::TimeRecorded { at });
                at
            }
        }
    }

    async fn execute_activity(
        &self,
        name: &str,
        options: &ActivityOptions,
        input: Value,
    ) -> Result<Value, ActivityError> {
        match self.next_recorded() {
            Some(HistoryEvent::ActivityCompleted { name: n, output }) if n == name => {
                debug!(run_id = %self.run_id, activity = name, "Replayed activity result");
                return Ok(output);
            }
            Some(HistoryEvent::ActivityFailed { name: n, error }) if n == name => {
                debug!(run_id = %self.run_id, activity = name, "Replayed activity failure");
                return Err(error);
            }
            Some(other) => {
                self.nondeterminism(name, &other);
                return Err(ActivityError::Cancelled);
            }
            None => {}
        }

        debug!(run_id = %self.run_id, activity = name, "Executing activity");
        let result = self.run_live(name, options, input).await;
        match &result {
            Ok(output) => self.record(HistoryEvent::ActivityCompleted {
                name: name.to_string(),
                output: output.clone(),
            }),
            Err(error) => self.record(HistoryEvent::ActivityFailed {
                name: name.to_string(),
                error: error.clone(),
            }),
        }
        result
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        match self.next_recorded() {
            Some(HistoryEvent::TimerFired { deadline: d }) if d == deadline => return,
            Some(other) => {
                self.nondeterminism("timer_fired", &other);
                return;
            }
            None => {}
        }

        if let Ok(remaining) = (deadline - self.clock.now()).to_std() {
            tokio::time::sleep(remaining).await;
        }
        self.record(HistoryEvent::TimerFired { deadline });
    }
}
