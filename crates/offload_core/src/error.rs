use std::time::Duration;

use thiserror::Error;

/// Every way a session operation can fail, as surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("empty filter")]
    EmptyFilter,
    #[error("no data loaded")]
    NoDataLoaded,
    #[error("another operation is still in progress")]
    Busy,
    #[error("background worker unavailable: {0}")]
    TransportUnavailable(String),
    #[error("error reading file: {0}")]
    FileRead(String),
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    UnsupportedAction(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Worker(String),
    #[error("no reply from worker after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserInput,
    Precondition,
    Busy,
    Transport,
    Decode,
    UnsupportedAction,
    Worker,
    Abandoned,
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::NoFileSelected | PipelineError::EmptyFilter => ErrorCategory::UserInput,
            PipelineError::NoDataLoaded => ErrorCategory::Precondition,
            PipelineError::Busy => ErrorCategory::Busy,
            PipelineError::TransportUnavailable(_) | PipelineError::FileRead(_) => {
                ErrorCategory::Transport
            }
            PipelineError::Decode(_) => ErrorCategory::Decode,
            PipelineError::UnsupportedAction(_) => ErrorCategory::UnsupportedAction,
            PipelineError::InvalidRequest(_) | PipelineError::Worker(_) => ErrorCategory::Worker,
            PipelineError::Timeout(_) | PipelineError::Cancelled => ErrorCategory::Abandoned,
        }
    }

    /// Rejected before anything was sent to the worker.
    pub fn is_local(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::UserInput | ErrorCategory::Precondition | ErrorCategory::Busy
        )
    }
}
