//! Local durable execution runtime.
//!
//! Runs [`PreprocessingWorkflow`](crate::workflow::PreprocessingWorkflow)
//! in-process. Every input a run observes is appended to a [`HistoryStore`]
//! so that re-running the same run id replays it instead of repeating side
//! effects.

mod activity;
mod clock;
mod context;
mod history;
mod sqlite;
mod worker;

pub use activity::*;
pub use clock::*;
pub use context::*;
pub use history::*;
pub use sqlite::*;
pub use worker::*;
