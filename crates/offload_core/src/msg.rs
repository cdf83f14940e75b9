use crate::{Dataset, FileHandle, PipelineError, RequestToken};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a file, or cleared the selection.
    FileSelected(Option<FileHandle>),
    /// User edited the filter text box.
    FilterTextChanged(String),
    /// User asked to load and parse the selected file.
    LoadRequested,
    /// User asked to filter the current dataset by the current filter text.
    FilterRequested,
    /// User asked to sort the current dataset.
    SortRequested,
    /// The worker answered, or the request was abandoned locally.
    WorkerReplied {
        token: RequestToken,
        result: Result<Dataset, PipelineError>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
