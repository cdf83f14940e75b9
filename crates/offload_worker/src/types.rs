use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type Record = serde_json::Value;
pub type Dataset = Vec<Record>;
pub type RequestToken = u64;

/// The closed set of actions the worker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Parse,
    Filter,
    Sort,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Parse => "parse",
            Action::Filter => "filter",
            Action::Sort => "sort",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = WorkerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "parse" => Ok(Action::Parse),
            "filter" => Ok(Action::Filter),
            "sort" => Ok(Action::Sort),
            other => Err(WorkerError::UnsupportedAction(other.to_string())),
        }
    }
}

/// Classification carried next to the message in an error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerErrorKind {
    Decode,
    UnsupportedAction,
    InvalidRequest,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("invalid JSON: {0}")]
    Decode(String),
    #[error("JSON root must be an array or an object, found {0}")]
    UnsupportedShape(&'static str),
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to process data: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn kind(&self) -> WorkerErrorKind {
        match self {
            WorkerError::Decode(_) | WorkerError::UnsupportedShape(_) => WorkerErrorKind::Decode,
            WorkerError::UnsupportedAction(_) => WorkerErrorKind::UnsupportedAction,
            WorkerError::InvalidRequest(_) => WorkerErrorKind::InvalidRequest,
            WorkerError::Internal(_) => WorkerErrorKind::Internal,
        }
    }
}

impl From<crate::DecodeError> for WorkerError {
    fn from(err: crate::DecodeError) -> Self {
        WorkerError::Decode(err.to_string())
    }
}
