//! Offload worker: message protocol, dataset transformations and the background thread.
mod coerce;
mod decode;
mod protocol;
mod transform;
mod types;
mod worker;

pub use decode::{decode_file_bytes, DecodeError, DecodedText};
pub use protocol::{
    decode_request, decode_response, encode_request, encode_response, ErrorReply, ParseSource,
    ProtocolError, Request, Response, WireRequest,
};
pub use transform::{
    canonical_text, filter_records, parse_json_text, select_sort_key, sort_records,
    JsonTransform, SortKey, Transform,
};
pub use types::{Action, Dataset, Record, RequestToken, WorkerError, WorkerErrorKind};
pub use worker::{
    handle_message, ChannelReplySink, ReplySink, WorkerGone, WorkerHandle, WorkerReply,
    WorkerSettings,
};
