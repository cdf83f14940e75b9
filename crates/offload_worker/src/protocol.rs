use serde::{Deserialize, Serialize};

use crate::{Action, Dataset, WorkerError, WorkerErrorKind};

/// The request exactly as it crosses the thread boundary.
///
/// `action` stays free text so an unknown action still decodes and can be
/// answered with an error instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Dataset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Parse { source: ParseSource },
    Filter { payload: Dataset, filter: Option<String> },
    Sort { payload: Dataset },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseSource {
    /// Raw file bytes; decoded to text by the worker.
    File(Vec<u8>),
    /// File text decoded by the sender.
    Content(String),
    /// Records that are already parsed.
    Payload(Dataset),
}

impl Request {
    pub fn action(&self) -> Action {
        match self {
            Request::Parse { .. } => Action::Parse,
            Request::Filter { .. } => Action::Filter,
            Request::Sort { .. } => Action::Sort,
        }
    }

    pub fn into_wire(self) -> WireRequest {
        let action = self.action().as_str().to_string();
        match self {
            Request::Parse { source } => match source {
                ParseSource::File(bytes) => WireRequest {
                    action,
                    file: Some(bytes),
                    ..WireRequest::default()
                },
                ParseSource::Content(text) => WireRequest {
                    action,
                    file_content: Some(text),
                    ..WireRequest::default()
                },
                ParseSource::Payload(payload) => WireRequest {
                    action,
                    payload: Some(payload),
                    ..WireRequest::default()
                },
            },
            Request::Filter { payload, filter } => WireRequest {
                action,
                payload: Some(payload),
                filter,
                ..WireRequest::default()
            },
            Request::Sort { payload } => WireRequest {
                action,
                payload: Some(payload),
                ..WireRequest::default()
            },
        }
    }

    pub fn from_wire(wire: WireRequest) -> Result<Self, WorkerError> {
        let action: Action = wire.action.parse()?;
        match action {
            Action::Parse => {
                let source = match (wire.file, wire.file_content, wire.payload) {
                    (Some(_), Some(_), _) => {
                        return Err(WorkerError::InvalidRequest(
                            "parse requires exactly one of file or fileContent".into(),
                        ))
                    }
                    (Some(bytes), None, _) => ParseSource::File(bytes),
                    (None, Some(text), _) => ParseSource::Content(text),
                    (None, None, Some(payload)) => ParseSource::Payload(payload),
                    (None, None, None) => {
                        return Err(WorkerError::InvalidRequest(
                            "parse requires file or fileContent".into(),
                        ))
                    }
                };
                Ok(Request::Parse { source })
            }
            Action::Filter => Ok(Request::Filter {
                payload: require_payload(wire.payload, action)?,
                filter: wire.filter,
            }),
            Action::Sort => Ok(Request::Sort {
                payload: require_payload(wire.payload, action)?,
            }),
        }
    }
}

fn require_payload(payload: Option<Dataset>, action: Action) -> Result<Dataset, WorkerError> {
    payload.ok_or_else(|| WorkerError::InvalidRequest(format!("{action} requires payload")))
}

/// Worker reply: a bare array on success, `{ "error": ... }` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    // Listed first: a struct variant would also accept a one-element array.
    Records(Dataset),
    Error(ErrorReply),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WorkerErrorKind>,
}

impl From<WorkerError> for ErrorReply {
    fn from(err: WorkerError) -> Self {
        Self {
            kind: Some(err.kind()),
            error: err.to_string(),
        }
    }
}

impl From<Result<Dataset, WorkerError>> for Response {
    fn from(result: Result<Dataset, WorkerError>) -> Self {
        match result {
            Ok(records) => Response::Records(records),
            Err(err) => Response::Error(err.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
}

pub fn encode_request(request: Request) -> Result<String, ProtocolError> {
    serde_json::to_string(&request.into_wire()).map_err(ProtocolError::Encode)
}

/// Decodes and validates a request; any problem becomes a replyable error.
pub fn decode_request(message: &str) -> Result<Request, WorkerError> {
    let wire: WireRequest = serde_json::from_str(message)
        .map_err(|err| WorkerError::InvalidRequest(err.to_string()))?;
    Request::from_wire(wire)
}

pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    serde_json::to_string(response).map_err(ProtocolError::Encode)
}

pub fn decode_response(message: &str) -> Result<Response, ProtocolError> {
    serde_json::from_str(message).map_err(ProtocolError::Malformed)
}
