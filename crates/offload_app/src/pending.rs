use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use offload_core::RequestToken;
use offload_logging::{offload_debug, offload_warn};
use offload_worker::{ReplySink, WorkerReply};
use tokio::sync::oneshot;

/// Requests awaiting a worker reply, keyed by token.
#[derive(Default)]
pub(crate) struct PendingReplies {
    waiting: Mutex<HashMap<RequestToken, oneshot::Sender<WorkerReply>>>,
}

impl PendingReplies {
    pub(crate) fn register(&self, token: RequestToken) -> oneshot::Receiver<WorkerReply> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(token, tx);
        rx
    }

    /// Stops waiting for `token`; a reply arriving later is discarded.
    pub(crate) fn forget(&self, token: RequestToken) -> bool {
        self.lock().remove(&token).is_some()
    }

    /// Drops every completion handle, waking their waiters with a closed channel.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestToken, oneshot::Sender<WorkerReply>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReplySink for PendingReplies {
    fn deliver(&self, reply: WorkerReply) {
        let token = reply.token;
        let Some(tx) = self.lock().remove(&token) else {
            offload_warn!("Discarding reply for abandoned request token={}", token);
            return;
        };
        if tx.send(reply).is_err() {
            offload_debug!("Reply for token={} arrived after its caller went away", token);
        }
    }
}
