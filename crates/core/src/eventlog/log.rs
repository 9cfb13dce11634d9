use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{Event, EventOutcome};

/// Position of an event inside the [`EventLog`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(usize);

/// Append-only, ordered sequence of events owned by a single run.
///
/// Events are only ever appended; existing entries can be completed through
/// their handle but never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new unspecified event and return its handle.
    pub fn start(&mut self, now: DateTime<Utc>, name: impl Into<String>) -> EventHandle {
        self.events.push(Event::new(now, name));
        EventHandle(self.events.len() - 1)
    }

    /// Complete the event behind `handle`. See [`Event::complete`].
    pub fn complete(
        &mut self,
        handle: EventHandle,
        now: DateTime<Utc>,
        outcome: EventOutcome,
        message: impl fmt::Display,
    ) -> &Event {
        self.events[handle.0].complete(now, outcome, message)
    }

    pub fn succeed(
        &mut self,
        handle: EventHandle,
        now: DateTime<Utc>,
        message: impl fmt::Display,
    ) -> &Event {
        self.complete(handle, now, EventOutcome::Success, message)
    }

    pub fn get(&self, handle: EventHandle) -> &Event {
        &self.events[handle.0]
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True when every event completed successfully.
    pub fn all_succeeded(&self) -> bool {
        self.events.iter().all(Event::is_success)
    }

    /// First event that completed with anything but success.
    pub fn first_failure(&self) -> Option<&Event> {
        self.events
            .iter()
            .find(|e| e.is_completed() && !e.is_success())
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 6, 14, 48, 12).unwrap()
    }

    #[test]
    fn test_start_appends_in_order() {
        let mut log = EventLog::new();
        let first = log.start(t0(), "first");
        let second = log.start(t0() + Duration::seconds(1), "second");

        assert_eq!(log.len(), 2);
        assert_eq!(log.get(first).name, "first");
        assert_eq!(log.get(second).name, "second");
        let names: Vec<&str> = log.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_complete_by_handle() {
        let mut log = EventLog::new();
        let first = log.start(t0(), "first");
        let second = log.start(t0(), "second");

        log.complete(
            second,
            t0() + Duration::seconds(2),
            EventOutcome::SystemFailure,
            format_args!("System error: {}", "boom"),
        );
        log.succeed(first, t0() + Duration::seconds(3), "done");

        assert!(log.get(first).is_success());
        assert_eq!(log.get(second).outcome, EventOutcome::SystemFailure);
        assert_eq!(log.get(second).message, "System error: boom");
        assert!(!log.all_succeeded());
        assert_eq!(log.first_failure().map(|e| e.name.as_str()), Some("second"));
        assert_eq!(log.last().map(|e| e.name.as_str()), Some("second"));
    }

    #[test]
    fn test_empty_log_all_succeeded() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert!(log.all_succeeded());
        assert!(log.first_failure().is_none());
    }

    #[test]
    fn test_pending_event_is_not_a_failure() {
        let mut log = EventLog::new();
        log.start(t0(), "pending");
        assert!(log.first_failure().is_none());
        assert!(!log.all_succeeded());
    }

    #[test]
    #[should_panic(expected = "completed twice")]
    fn test_double_completion_through_log_panics() {
        let mut log = EventLog::new();
        let handle = log.start(t0(), "once");
        log.succeed(handle, t0(), "ok");
        log.succeed(handle, t0(), "again");
    }

    #[test]
    fn test_serializes_as_sequence() {
        let mut log = EventLog::new();
        let handle = log.start(t0(), "Bag SIP");
        log.succeed(handle, t0(), "SIP has been bagged");

        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["name"], "Bag SIP");

        let parsed: EventLog = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, log);
    }
}
