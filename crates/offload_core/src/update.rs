use std::sync::Arc;

use crate::{AppState, Effect, Msg, Operation, OperationKind, PipelineError, SessionState};

/// Pure update function: applies a message to state and returns any effects.
///
/// A rejected request leaves the error in [`AppState::last_error`] and emits no effect.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => {
            state.select_file(file);
            Vec::new()
        }
        Msg::FilterTextChanged(text) => {
            state.set_filter_text(text);
            Vec::new()
        }
        Msg::LoadRequested => {
            if state.session() == SessionState::Busy {
                state.reject(PipelineError::Busy);
                return (state, Vec::new());
            }
            let Some(file) = state.selected_file().cloned() else {
                state.reject(PipelineError::NoFileSelected);
                return (state, Vec::new());
            };
            let token = state.begin(OperationKind::Parse);
            vec![Effect::Dispatch {
                token,
                operation: Operation::Parse { file },
            }]
        }
        Msg::FilterRequested => {
            if let Err(error) = check_dataset_ready(&state) {
                state.reject(error);
                return (state, Vec::new());
            }
            let text = state.filter_text().trim().to_string();
            if text.is_empty() {
                state.reject(PipelineError::EmptyFilter);
                return (state, Vec::new());
            }
            let dataset = Arc::clone(state.dataset());
            let token = state.begin(OperationKind::Filter);
            vec![Effect::Dispatch {
                token,
                operation: Operation::Filter { dataset, text },
            }]
        }
        Msg::SortRequested => {
            if let Err(error) = check_dataset_ready(&state) {
                state.reject(error);
                return (state, Vec::new());
            }
            let dataset = Arc::clone(state.dataset());
            let token = state.begin(OperationKind::Sort);
            vec![Effect::Dispatch {
                token,
                operation: Operation::Sort { dataset },
            }]
        }
        Msg::WorkerReplied { token, result } => {
            // Late replies for abandoned requests are dropped here.
            state.finish(token, result);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn check_dataset_ready(state: &AppState) -> Result<(), PipelineError> {
    if state.session() == SessionState::Busy {
        return Err(PipelineError::Busy);
    }
    if state.dataset().is_empty() {
        return Err(PipelineError::NoDataLoaded);
    }
    Ok(())
}
