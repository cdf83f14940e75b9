//! Offload core: pure session state machine and view-model helpers.
mod effect;
mod error;
mod msg;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::{Effect, Operation};
pub use error::{ErrorCategory, PipelineError};
pub use msg::Msg;
pub use state::{AppState, Completion, InFlight, SessionState};
pub use types::{Dataset, FileHandle, FileSource, OperationKind, Record, RequestToken};
pub use update::update;
pub use view_model::AppViewModel;
