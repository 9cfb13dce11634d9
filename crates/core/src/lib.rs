pub mod bagcreate;
pub mod config;
pub mod eventlog;
pub mod metrics;
pub mod runtime;
pub mod testing;
pub mod workflow;

pub use bagcreate::{BagCreateActivity, BagCreateError, BagCreateParams, BagCreateResult};
pub use config::{
    load_config, load_config_from_str, read_config, validate_config, ChecksumAlgorithm,
    ConfigError, Configuration, LoadedConfig,
};
pub use eventlog::{Event, EventLog, EventOutcome};
pub use runtime::{
    ActivityRegistry, HistoryStore, InMemoryHistoryStore, SqliteHistoryStore, Worker,
    WorkerError, WorkerStatus,
};
pub use workflow::{
    Outcome, PreprocessingParams, PreprocessingResult, PreprocessingWorkflow, WorkflowContext,
    WorkflowError,
};
