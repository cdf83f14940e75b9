use std::sync::Arc;

use crate::view_model::AppViewModel;
use crate::{Dataset, FileHandle, OperationKind, PipelineError, RequestToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Busy,
}

/// The single request currently awaiting a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub token: RequestToken,
    pub kind: OperationKind,
}

/// The most recent operation that replaced the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub token: RequestToken,
    pub kind: OperationKind,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    dataset: Arc<Dataset>,
    selected_file: Option<FileHandle>,
    filter_text: String,
    in_flight: Option<InFlight>,
    last_token: RequestToken,
    last_error: Option<PipelineError>,
    last_completion: Option<Completion>,
    stale_replies: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            session: self.session(),
            loading: self.in_flight.is_some(),
            record_count: self.dataset.len(),
            records: Arc::clone(&self.dataset),
            filter_text: self.filter_text.clone(),
            selected_file: self.selected_file.as_ref().map(|file| file.name.clone()),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            last_completion: self.last_completion,
            dirty: self.dirty,
        }
    }

    pub fn session(&self) -> SessionState {
        if self.in_flight.is_some() {
            SessionState::Busy
        } else {
            SessionState::Idle
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn selected_file(&self) -> Option<&FileHandle> {
        self.selected_file.as_ref()
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&PipelineError> {
        self.last_error.as_ref()
    }

    pub fn last_completion(&self) -> Option<Completion> {
        self.last_completion
    }

    /// Replies that arrived for a request that was no longer in flight.
    pub fn stale_replies(&self) -> u64 {
        self.stale_replies
    }

    /// Returns whether the view changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn select_file(&mut self, file: Option<FileHandle>) {
        self.selected_file = file;
        self.mark_dirty();
    }

    pub(crate) fn set_filter_text(&mut self, text: String) {
        if self.filter_text != text {
            self.filter_text = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn reject(&mut self, error: PipelineError) {
        self.last_error = Some(error);
        self.mark_dirty();
    }

    /// Marks the session busy with a fresh token.
    pub(crate) fn begin(&mut self, kind: OperationKind) -> RequestToken {
        self.last_token += 1;
        let token = self.last_token;
        self.in_flight = Some(InFlight { token, kind });
        self.last_error = None;
        self.mark_dirty();
        token
    }

    /// Applies a reply. Returns `false` when `token` is not the request in flight.
    pub(crate) fn finish(
        &mut self,
        token: RequestToken,
        result: Result<Dataset, PipelineError>,
    ) -> bool {
        let in_flight = match self.in_flight {
            Some(in_flight) if in_flight.token == token => in_flight,
            _ => {
                self.stale_replies += 1;
                return false;
            }
        };

        self.in_flight = None;
        match result {
            Ok(dataset) => {
                self.last_completion = Some(Completion {
                    token,
                    kind: in_flight.kind,
                    records: dataset.len(),
                });
                self.dataset = Arc::new(dataset);
                self.last_error = None;
            }
            Err(error) => {
                self.last_error = Some(error);
            }
        }
        self.mark_dirty();
        true
    }
}
