//! Preservation task event log.
//!
//! Every run records its steps as [`Event`]s in an [`EventLog`]. An event is
//! appended when its step starts and completed exactly once when the step
//! finishes; the log itself is append-only.

mod event;
mod log;

pub use event::{Event, EventOutcome};
pub use log::{EventHandle, EventLog};
