use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of a single preservation task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    #[default]
    Unspecified,
    Success,
    ValidationFailure,
    SystemFailure,
    ContentFailure,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Success => "success",
            Self::ValidationFailure => "validation_failure",
            Self::SystemFailure => "system_failure",
            Self::ContentFailure => "content_failure",
        }
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped record of one named step within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub message: String,
    pub outcome: EventOutcome,
    pub started_at: DateTime<Utc>,
    /// Unset until the event is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(started_at: DateTime<Utc>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: String::new(),
            outcome: EventOutcome::Unspecified,
            started_at,
            completed_at: None,
        }
    }

    /// Record the terminal outcome.
    ///
    /// # Panics
    ///
    /// Panics if the event was already completed, `outcome` is
    /// [`EventOutcome::Unspecified`] or `completed_at` precedes the start.
    pub fn complete(
        &mut self,
        completed_at: DateTime<Utc>,
        outcome: EventOutcome,
        message: impl fmt::Display,
    ) -> &mut Self {
        assert!(
            !self.is_completed(),
            "event {:?} completed twice",
            self.name
        );
        assert!(
            outcome != EventOutcome::Unspecified,
            "event {:?} completed without an outcome",
            self.name
        );
        assert!(
            completed_at >= self.started_at,
            "event {:?} completed before it started",
            self.name
        );

        self.completed_at = Some(completed_at);
        self.outcome = outcome;
        self.message = message.to_string();
        self
    }

    pub fn succeed(&mut self, completed_at: DateTime<Utc>, message: impl fmt::Display) -> &mut Self {
        self.complete(completed_at, EventOutcome::Success, message)
    }

    pub fn is_success(&self) -> bool {
        self.outcome == EventOutcome::Success
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 6, 14, 48, 12).unwrap()
    }

    fn completed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 6, 14, 48, 13).unwrap()
    }

    #[test]
    fn test_event_succeeds() {
        let mut event = Event::new(started(), "test event");
        event.complete(
            completed(),
            EventOutcome::Success,
            format_args!("completed at {}", completed().to_rfc3339()),
        );

        assert_eq!(
            event,
            Event {
                name: "test event".to_string(),
                message: "completed at 2024-06-06T14:48:13+00:00".to_string(),
                outcome: EventOutcome::Success,
                started_at: started(),
                completed_at: Some(completed()),
            }
        );
        assert!(event.is_success());
    }

    #[test]
    fn test_event_validation_failure() {
        let path = "/tmp/test-sip/additional/UpdatedAreldaMetadata.xml";

        let mut event = Event::new(started(), "test event");
        event.complete(
            completed(),
            EventOutcome::ValidationFailure,
            format_args!(
                "Content error: metadata validation has failed: {} does not match expected metadata requirements",
                path
            ),
        );

        assert_eq!(
            event.message,
            format!(
                "Content error: metadata validation has failed: {} does not match expected metadata requirements",
                path
            )
        );
        assert_eq!(event.outcome, EventOutcome::ValidationFailure);
        assert!(!event.is_success());
    }

    #[test]
    fn test_new_event_is_unspecified() {
        let event = Event::new(started(), "pending");
        assert_eq!(event.outcome, EventOutcome::Unspecified);
        assert!(event.completed_at.is_none());
        assert!(event.message.is_empty());
        assert!(!event.is_completed());
    }

    #[test]
    #[should_panic(expected = "completed twice")]
    fn test_second_completion_panics() {
        let mut event = Event::new(started(), "twice");
        event.succeed(completed(), "first");
        event.succeed(completed(), "second");
    }

    #[test]
    #[should_panic(expected = "without an outcome")]
    fn test_unspecified_completion_panics() {
        let mut event = Event::new(started(), "bad");
        event.complete(completed(), EventOutcome::Unspecified, "nope");
    }

    #[test]
    #[should_panic(expected = "completed before it started")]
    fn test_completion_before_start_panics() {
        let mut event = Event::new(completed(), "backwards");
        event.succeed(started(), "done");
    }

    #[test]
    fn test_serialization_omits_unset_completion() {
        let event = Event::new(started(), "pending");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["outcome"], "unspecified");
        assert!(json.get("completed_at").is_none());
    }
}
