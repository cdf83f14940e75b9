use std::sync::Arc;

use crate::{Dataset, FileHandle, OperationKind, RequestToken};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send one request to the worker. At most one is outstanding per session.
    Dispatch {
        token: RequestToken,
        operation: Operation,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Parse { file: FileHandle },
    Filter { dataset: Arc<Dataset>, text: String },
    Sort { dataset: Arc<Dataset> },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Parse { .. } => OperationKind::Parse,
            Operation::Filter { .. } => OperationKind::Filter,
            Operation::Sort { .. } => OperationKind::Sort,
        }
    }
}
