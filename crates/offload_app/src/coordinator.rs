use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use offload_core::{
    update, AppState, AppViewModel, Dataset, Effect, FileHandle, FileSource, Msg, Operation,
    PipelineError, RequestToken,
};
use offload_logging::{offload_debug, offload_info, offload_warn, TimedSection};
use offload_worker::{
    decode_response, encode_request, handle_message, ErrorReply, JsonTransform, ParseSource,
    ReplySink, Request, Response, Transform, WorkerErrorKind, WorkerHandle, WorkerReply,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::pending::PendingReplies;
use crate::{CoordinatorSettings, FallbackPolicy, OperationTimings};

enum Transport {
    NotStarted,
    Running(WorkerHandle),
    Unavailable(String),
}

enum Submitted {
    Pending(oneshot::Receiver<WorkerReply>),
    Inline(String),
}

/// Result of feeding messages through the state machine.
struct Step {
    effects: Vec<Effect>,
    dataset: Arc<Dataset>,
    last_error: Option<PipelineError>,
}

/// Owns a session: its state, its worker, and the request in flight.
///
/// Operations take `&self`; a call made while another is pending is rejected
/// with [`PipelineError::Busy`] rather than queued.
pub struct Coordinator {
    settings: CoordinatorSettings,
    transform: Arc<dyn Transform>,
    state: Mutex<AppState>,
    transport: Mutex<Transport>,
    pending: Arc<PendingReplies>,
    current_cancel: Mutex<Option<CancellationToken>>,
    last_timings: Mutex<Option<OperationTimings>>,
}

impl Coordinator {
    pub fn new(settings: CoordinatorSettings) -> Self {
        Self::with_transform(settings, Arc::new(JsonTransform))
    }

    pub fn with_transform(settings: CoordinatorSettings, transform: Arc<dyn Transform>) -> Self {
        Self {
            settings,
            transform,
            state: Mutex::new(AppState::new()),
            transport: Mutex::new(Transport::NotStarted),
            pending: Arc::new(PendingReplies::default()),
            current_cancel: Mutex::new(None),
            last_timings: Mutex::new(None),
        }
    }

    /// Parses `file` and makes it the current dataset.
    pub async fn load(&self, file: Option<FileHandle>) -> Result<Arc<Dataset>, PipelineError> {
        self.run(Some(Msg::FileSelected(file)), Msg::LoadRequested)
            .await
    }

    /// Keeps the records whose text contains `text`, ignoring case.
    pub async fn filter(&self, text: &str) -> Result<Arc<Dataset>, PipelineError> {
        self.run(
            Some(Msg::FilterTextChanged(text.to_string())),
            Msg::FilterRequested,
        )
        .await
    }

    pub async fn sort(&self) -> Result<Arc<Dataset>, PipelineError> {
        self.run(None, Msg::SortRequested).await
    }

    /// Abandons the request in flight, if any. Its eventual reply is discarded.
    pub fn cancel(&self) -> bool {
        match lock(&self.current_cancel).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        lock(&self.state).view()
    }

    pub fn dataset(&self) -> Arc<Dataset> {
        Arc::clone(lock(&self.state).dataset())
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).in_flight().is_some()
    }

    pub fn last_timings(&self) -> Option<OperationTimings> {
        lock(&self.last_timings).clone()
    }

    /// Stops the worker thread, waiting for the request it is processing.
    /// A later operation starts a fresh worker.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *lock(&self.transport), Transport::NotStarted);
        self.pending.clear();
        if let Transport::Running(worker) = previous {
            worker.shutdown();
            offload_info!("Worker thread shut down");
        }
    }

    async fn run(&self, input: Option<Msg>, request: Msg) -> Result<Arc<Dataset>, PipelineError> {
        let started = Instant::now();
        let step = self.step(input, request);
        let Some(Effect::Dispatch { token, operation }) = step.effects.into_iter().next() else {
            return Err(step.last_error.unwrap_or_else(|| {
                PipelineError::Worker("request was not dispatched".to_string())
            }));
        };

        let kind = operation.kind();
        offload_debug!("Dispatching {} token={}", kind, token);
        let cancel = CancellationToken::new();
        *lock(&self.current_cancel) = Some(cancel.clone());
        let guard = InFlightGuard {
            coordinator: self,
            token,
            armed: true,
        };

        let mut timings = OperationTimings::new(kind);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.execute(token, operation, &mut timings) => result,
        };
        guard.disarm();
        *lock(&self.current_cancel) = None;

        if let Err(err) = &result {
            self.pending.forget(token);
            offload_warn!("{} token={} failed: {}", kind, token, err);
        }
        let error = result.as_ref().err().cloned();
        let step = self.step(None, Msg::WorkerReplied { token, result });

        timings.settle(started.elapsed(), step.dataset.len());
        if self.settings.log_kpis {
            timings.log_kpis();
        }
        *lock(&self.last_timings) = Some(timings);

        match error {
            Some(err) => Err(err),
            None => Ok(step.dataset),
        }
    }

    /// Applies `input` and then `request` under one lock. While a request is in
    /// flight `input` is dropped, so a call rejected as busy changes nothing
    /// beyond the recorded error.
    fn step(&self, input: Option<Msg>, request: Msg) -> Step {
        let mut guard = lock(&self.state);
        let mut state = std::mem::take(&mut *guard);
        let busy = state.in_flight().is_some();
        let mut effects = Vec::new();
        for msg in input.filter(|_| !busy).into_iter().chain(Some(request)) {
            let (next, produced) = update(state, msg);
            state = next;
            effects.extend(produced);
        }
        let step = Step {
            effects,
            dataset: Arc::clone(state.dataset()),
            last_error: state.last_error().cloned(),
        };
        *guard = state;
        step
    }

    async fn execute(
        &self,
        token: RequestToken,
        operation: Operation,
        timings: &mut OperationTimings,
    ) -> Result<Dataset, PipelineError> {
        let request = build_request(operation, timings).await?;

        let section = TimedSection::start("request serialization");
        let message =
            encode_request(request).map_err(|err| PipelineError::Worker(err.to_string()))?;
        timings.serialization = section.finish();

        let reply = match self.submit(token, message, timings)? {
            Submitted::Inline(reply) => reply,
            Submitted::Pending(rx) => {
                let section = TimedSection::start("worker round trip");
                let reply = self.await_reply(rx).await;
                timings.communication = section.finish();
                let reply = reply?;
                timings.worker_processing = reply.processing;
                reply.message
            }
        };

        let section = TimedSection::start("reply deserialization");
        let response =
            decode_response(&reply).map_err(|err| PipelineError::Worker(err.to_string()));
        timings.deserialization = section.finish();

        match response? {
            Response::Records(records) => Ok(records),
            Response::Error(reply) => Err(map_error_reply(reply)),
        }
    }

    fn submit(
        &self,
        token: RequestToken,
        message: String,
        timings: &mut OperationTimings,
    ) -> Result<Submitted, PipelineError> {
        {
            let mut transport = lock(&self.transport);
            if matches!(*transport, Transport::NotStarted) {
                *transport = self.start_worker();
            }

            match &*transport {
                Transport::Running(worker) => {
                    let rx = self.pending.register(token);
                    let section = TimedSection::start("post message");
                    if worker.submit(token, message).is_err() {
                        self.pending.forget(token);
                        // Recreated on the next operation.
                        *transport = Transport::NotStarted;
                        return Err(PipelineError::TransportUnavailable(
                            "worker thread has stopped".to_string(),
                        ));
                    }
                    timings.post_message = section.finish();
                    timings.threads = 2;
                    return Ok(Submitted::Pending(rx));
                }
                Transport::Unavailable(reason) => {
                    if self.settings.fallback == FallbackPolicy::Fail {
                        return Err(PipelineError::TransportUnavailable(reason.clone()));
                    }
                }
                Transport::NotStarted => {
                    return Err(PipelineError::TransportUnavailable(
                        "worker was not started".to_string(),
                    ));
                }
            }
        }

        offload_debug!("Running token={} inline", token);
        let section = TimedSection::start("inline processing");
        let reply = handle_message(self.transform.as_ref(), &message);
        timings.worker_processing = section.finish();
        timings.threads = 1;
        Ok(Submitted::Inline(reply))
    }

    fn start_worker(&self) -> Transport {
        if !self.settings.background {
            offload_warn!("Background execution disabled; worker not started");
            return Transport::Unavailable("background execution is not supported".to_string());
        }

        let sink: Arc<dyn ReplySink> = self.pending.clone();
        let settings = self.settings.worker_settings();
        match WorkerHandle::spawn(&settings, Arc::clone(&self.transform), sink) {
            Ok(worker) => {
                offload_info!("Started worker thread {:?}", settings.thread_name);
                Transport::Running(worker)
            }
            Err(err) => {
                offload_warn!("Could not start worker thread: {}", err);
                Transport::Unavailable(err.to_string())
            }
        }
    }

    async fn await_reply(
        &self,
        rx: oneshot::Receiver<WorkerReply>,
    ) -> Result<WorkerReply, PipelineError> {
        let closed =
            |_| PipelineError::TransportUnavailable("worker stopped before replying".to_string());
        match self.settings.request_timeout() {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received.map_err(closed),
                Err(_) => Err(PipelineError::Timeout(limit)),
            },
            None => rx.await.map_err(closed),
        }
    }
}

/// Settles the in-flight request as cancelled when its future is dropped
/// before completing.
struct InFlightGuard<'a> {
    coordinator: &'a Coordinator,
    token: RequestToken,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let coordinator = self.coordinator;
        offload_warn!("Request token={} dropped before completion", self.token);
        coordinator.pending.forget(self.token);
        *lock(&coordinator.current_cancel) = None;
        coordinator.step(
            None,
            Msg::WorkerReplied {
                token: self.token,
                result: Err(PipelineError::Cancelled),
            },
        );
    }
}

async fn build_request(
    operation: Operation,
    timings: &mut OperationTimings,
) -> Result<Request, PipelineError> {
    let request = match operation {
        Operation::Parse { file } => {
            let source = match file.source {
                FileSource::Path(path) => {
                    let section = TimedSection::start("file read");
                    let bytes = tokio::fs::read(&path).await.map_err(|err| {
                        PipelineError::FileRead(format!("{}: {err}", path.display()))
                    })?;
                    timings.file_read = Some(section.finish());
                    ParseSource::File(bytes)
                }
                FileSource::Bytes(bytes) => ParseSource::File(bytes),
                FileSource::Text(text) => ParseSource::Content(text),
            };
            Request::Parse { source }
        }
        Operation::Filter { dataset, text } => Request::Filter {
            payload: dataset.as_ref().clone(),
            filter: Some(text),
        },
        Operation::Sort { dataset } => Request::Sort {
            payload: dataset.as_ref().clone(),
        },
    };
    Ok(request)
}

fn map_error_reply(reply: ErrorReply) -> PipelineError {
    match reply.kind {
        Some(WorkerErrorKind::Decode) => PipelineError::Decode(reply.error),
        Some(WorkerErrorKind::UnsupportedAction) => PipelineError::UnsupportedAction(reply.error),
        Some(WorkerErrorKind::InvalidRequest) => PipelineError::InvalidRequest(reply.error),
        Some(WorkerErrorKind::Internal) | None => PipelineError::Worker(reply.error),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
