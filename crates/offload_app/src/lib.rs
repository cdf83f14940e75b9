//! Offload app: the coordinator that drives the session state machine and
//! the background worker, plus its settings and timing reports.
mod coordinator;
mod pending;
mod settings;
mod timings;

pub use coordinator::Coordinator;
pub use settings::{load_settings, CoordinatorSettings, FallbackPolicy, SettingsError};
pub use timings::OperationTimings;

pub use offload_core::{
    AppViewModel, Dataset, ErrorCategory, FileHandle, FileSource, OperationKind, PipelineError,
    Record,
};
