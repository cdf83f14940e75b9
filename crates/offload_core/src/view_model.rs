use std::sync::Arc;

use crate::{Completion, Dataset, SessionState};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    /// Triggers for load/filter/sort should be disabled while this is set.
    pub loading: bool,
    pub record_count: usize,
    pub records: Arc<Dataset>,
    pub filter_text: String,
    pub selected_file: Option<String>,
    pub last_error: Option<String>,
    pub last_completion: Option<Completion>,
    pub dirty: bool,
}
