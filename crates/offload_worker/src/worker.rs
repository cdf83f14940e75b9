use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use offload_logging::{offload_debug, offload_error, offload_info, offload_warn, TimedSection};

use crate::{
    decode_request, encode_response, RequestToken, Response, Transform, WorkerError,
};

enum WorkerCommand {
    Process {
        token: RequestToken,
        message: String,
    },
    Shutdown,
}

/// A serialized reply together with the token of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReply {
    pub token: RequestToken,
    pub message: String,
    /// Time spent inside the worker, decode to encode.
    pub processing: Duration,
}

pub trait ReplySink: Send + Sync {
    fn deliver(&self, reply: WorkerReply);
}

pub struct ChannelReplySink {
    tx: mpsc::Sender<WorkerReply>,
}

impl ChannelReplySink {
    pub fn new(tx: mpsc::Sender<WorkerReply>) -> Self {
        Self { tx }
    }
}

impl ReplySink for ChannelReplySink {
    fn deliver(&self, reply: WorkerReply) {
        let _ = self.tx.send(reply);
    }
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            thread_name: "offload-worker".to_string(),
            stack_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("worker thread has stopped")]
pub struct WorkerGone;

/// Owns the background thread. Requests are processed strictly one at a time
/// in submission order.
pub struct WorkerHandle {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(
        settings: &WorkerSettings,
        transform: Arc<dyn Transform>,
        sink: Arc<dyn ReplySink>,
    ) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let mut builder = thread::Builder::new().name(settings.thread_name.clone());
        if let Some(size) = settings.stack_size {
            builder = builder.stack_size(size);
        }
        let thread = builder.spawn(move || run(cmd_rx, transform.as_ref(), sink.as_ref()))?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    pub fn submit(&self, token: RequestToken, message: String) -> Result<(), WorkerGone> {
        self.cmd_tx
            .send(WorkerCommand::Process { token, message })
            .map_err(|_| WorkerGone)
    }

    pub fn is_alive(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stops the thread after the request it is working on, and waits for it.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                offload_warn!("Worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.cmd_tx.send(WorkerCommand::Shutdown);
        }
    }
}

fn run(cmd_rx: mpsc::Receiver<WorkerCommand>, transform: &dyn Transform, sink: &dyn ReplySink) {
    offload_info!("Worker thread started");
    while let Ok(command) = cmd_rx.recv() {
        match command {
            WorkerCommand::Process { token, message } => {
                offload_debug!("Worker received token={} bytes={}", token, message.len());
                let section = TimedSection::start("worker request");
                let reply = handle_message(transform, &message);
                let processing = section.finish();
                sink.deliver(WorkerReply {
                    token,
                    message: reply,
                    processing,
                });
            }
            WorkerCommand::Shutdown => break,
        }
    }
    offload_info!("Worker thread stopped");
}

/// Handles one serialized request and returns the serialized reply.
///
/// Never panics: malformed input, unsupported actions and failures inside
/// the transform all come back as error replies.
pub fn handle_message(transform: &dyn Transform, message: &str) -> String {
    let result = decode_request(message).and_then(|request| {
        let action = request.action();
        panic::catch_unwind(AssertUnwindSafe(|| transform.apply(request)))
            .unwrap_or_else(|payload| Err(WorkerError::Internal(panic_message(payload.as_ref()))))
            .inspect_err(|err| offload_warn!("Worker {} failed: {}", action, err))
    });
    if let Err(WorkerError::UnsupportedAction(action)) = &result {
        offload_warn!("Worker rejected unsupported action {:?}", action);
    }

    let response = Response::from(result);
    encode_response(&response).unwrap_or_else(|err| {
        offload_error!("Failed to encode worker reply: {}", err);
        serde_json::json!({
            "error": format!("failed to process data: {err}"),
            "kind": "internal",
        })
        .to_string()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker panicked".to_string()
    }
}
