use std::time::Duration;

use offload_core::OperationKind;
use offload_logging::offload_info;

/// Where the time went for one dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationTimings {
    pub kind: OperationKind,
    /// 2 when a background worker ran the request, 1 when it ran inline.
    pub threads: usize,
    pub file_read: Option<Duration>,
    pub serialization: Duration,
    pub post_message: Duration,
    /// From handing the request to the worker until its reply arrived.
    pub communication: Duration,
    pub worker_processing: Duration,
    pub deserialization: Duration,
    /// Time the calling task spent on synchronous work: serialization,
    /// posting, deserialization, and the transform itself when run inline.
    pub blocking: Duration,
    pub total: Duration,
    /// Dataset size once the operation settled.
    pub records: usize,
}

impl OperationTimings {
    pub(crate) fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            threads: 1,
            file_read: None,
            serialization: Duration::ZERO,
            post_message: Duration::ZERO,
            communication: Duration::ZERO,
            worker_processing: Duration::ZERO,
            deserialization: Duration::ZERO,
            blocking: Duration::ZERO,
            total: Duration::ZERO,
            records: 0,
        }
    }

    pub(crate) fn settle(&mut self, total: Duration, records: usize) {
        self.total = total;
        self.records = records;
        self.blocking = self.serialization + self.post_message + self.deserialization;
        if self.threads == 1 {
            self.blocking += self.worker_processing;
        }
    }

    pub fn log_kpis(&self) {
        offload_info!("--- KPIs {} ---", self.kind);
        offload_info!("Threads used: {}", self.threads);
        offload_info!("Total time: {:.3} ms", ms(self.total));
        offload_info!("Calling task blocked: {:.3} ms", ms(self.blocking));
        if let Some(file_read) = self.file_read {
            offload_info!("File read: {:.3} ms", ms(file_read));
        }
        offload_info!("Worker communication: {:.3} ms", ms(self.communication));
        offload_info!("  - Serialization: {:.3} ms", ms(self.serialization));
        offload_info!("  - Post message: {:.3} ms", ms(self.post_message));
        offload_info!("  - Worker processing: {:.3} ms", ms(self.worker_processing));
        offload_info!("  - Deserialization: {:.3} ms", ms(self.deserialization));
        offload_info!("Records: {}", self.records);
    }
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
