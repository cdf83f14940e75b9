use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, Once};
use std::time::Duration;

use offload_app::{
    Coordinator, CoordinatorSettings, ErrorCategory, FallbackPolicy, FileHandle, OperationKind,
    PipelineError,
};
use offload_worker::{Dataset, JsonTransform, Request, Transform, WorkerError};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(offload_logging::initialize_for_tests);
}

fn settings() -> CoordinatorSettings {
    CoordinatorSettings {
        log_kpis: false,
        ..CoordinatorSettings::default()
    }
}

fn people() -> FileHandle {
    FileHandle::from_text(
        "people.json",
        r#"[{"id": 3, "name": "Carol"}, {"id": 1, "name": "Ann"}, {"id": 2, "name": "Bob"}]"#,
    )
}

/// Holds every request until the test releases it.
struct GatedTransform {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl GatedTransform {
    fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self { gate: Mutex::new(rx) }, tx)
    }
}

impl Transform for GatedTransform {
    fn apply(&self, request: Request) -> Result<Dataset, WorkerError> {
        if let Ok(gate) = self.gate.lock() {
            let _ = gate.recv();
        }
        JsonTransform.apply(request)
    }
}

/// Stalls only the first request it sees.
struct SlowFirstTransform {
    stalled: AtomicBool,
    delay: Duration,
}

impl Transform for SlowFirstTransform {
    fn apply(&self, request: Request) -> Result<Dataset, WorkerError> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            std::thread::sleep(self.delay);
        }
        JsonTransform.apply(request)
    }
}

async fn wait_until_busy(coordinator: &Coordinator) {
    while !coordinator.is_busy() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn load_sort_and_filter_round_trip() {
    init_logging();
    let coordinator = Coordinator::new(settings());

    let loaded = coordinator.load(Some(people())).await.expect("load");
    assert_eq!(loaded.len(), 3);

    let sorted = coordinator.sort().await.expect("sort");
    let ids: Vec<_> = sorted.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);

    let filtered = coordinator.filter("  BOB ").await.expect("filter");
    assert_eq!(*filtered, vec![json!({"id": 2, "name": "Bob"})]);
    assert_eq!(coordinator.view().filter_text, "  BOB ");

    let timings = coordinator.last_timings().expect("timings");
    assert_eq!(timings.kind, OperationKind::Filter);
    assert_eq!(timings.threads, 2);
    assert_eq!(timings.records, 1);
    assert_eq!(timings.file_read, None);

    let none = coordinator.filter("zelda").await.expect("filter to nothing");
    assert!(none.is_empty());
    assert_eq!(coordinator.view().last_error, None);

    let err = coordinator.filter("ann").await.unwrap_err();
    assert_eq!(err, PipelineError::NoDataLoaded);

    coordinator.shutdown();
}

#[tokio::test]
async fn object_of_records_loads_values_in_document_order() {
    init_logging();
    let coordinator = Coordinator::new(settings());
    let file = FileHandle::from_bytes(
        "map.json",
        br#"{"b": {"name": "second"}, "a": {"name": "first"}}"#.to_vec(),
    );

    let loaded = coordinator.load(Some(file)).await.expect("load");
    assert_eq!(
        *loaded,
        vec![json!({"name": "second"}), json!({"name": "first"})]
    );
}

#[tokio::test]
async fn malformed_file_keeps_previous_dataset() {
    init_logging();
    let coordinator = Coordinator::new(settings());
    coordinator.load(Some(people())).await.expect("load");

    let err = coordinator
        .load(Some(FileHandle::from_text("broken.json", "[{\"id\": 1,")))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Decode);
    assert!(err.to_string().starts_with("invalid JSON"));
    assert_eq!(coordinator.dataset().len(), 3);
    assert!(!coordinator.is_busy());
}

#[tokio::test]
async fn local_rejections_never_reach_the_worker() {
    init_logging();
    let (transform, release) = GatedTransform::new();
    let coordinator = Coordinator::with_transform(settings(), Arc::new(transform));

    assert_eq!(
        coordinator.load(None).await.unwrap_err(),
        PipelineError::NoFileSelected
    );
    assert_eq!(coordinator.sort().await.unwrap_err(), PipelineError::NoDataLoaded);

    release.send(()).expect("release load");
    coordinator.load(Some(people())).await.expect("load");

    // A dispatched filter would block forever on the gate.
    assert_eq!(
        coordinator.filter("   ").await.unwrap_err(),
        PipelineError::EmptyFilter
    );
    assert_eq!(coordinator.dataset().len(), 3);
}

#[tokio::test]
async fn overlapping_call_is_rejected_as_busy() {
    init_logging();
    let (transform, release) = GatedTransform::new();
    let coordinator = Coordinator::with_transform(settings(), Arc::new(transform));

    let (first, rejected) = tokio::join!(coordinator.load(Some(people())), async {
        wait_until_busy(&coordinator).await;
        let rejected = (
            coordinator.sort().await,
            coordinator.filter("zzz").await,
            coordinator.load(None).await,
        );
        let view = coordinator.view();
        release.send(()).expect("release load");
        (rejected, view)
    });
    let ((sort, filter, load), view_while_busy) = rejected;

    assert_eq!(first.expect("load").len(), 3);
    assert_eq!(sort.unwrap_err(), PipelineError::Busy);
    assert_eq!(filter.unwrap_err(), PipelineError::Busy);
    assert_eq!(load.unwrap_err(), PipelineError::Busy);
    assert_eq!(view_while_busy.filter_text, "");
    assert_eq!(view_while_busy.selected_file.as_deref(), Some("people.json"));
    assert!(!coordinator.is_busy());
    assert_eq!(coordinator.view().selected_file.as_deref(), Some("people.json"));
}

#[tokio::test]
async fn dropped_operation_does_not_leave_the_session_busy() {
    init_logging();
    let transform = SlowFirstTransform {
        stalled: AtomicBool::new(false),
        delay: Duration::from_millis(200),
    };
    let coordinator = Coordinator::with_transform(settings(), Arc::new(transform));

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), coordinator.load(Some(people()))).await;
    assert!(abandoned.is_err());
    assert!(!coordinator.is_busy());
    assert!(!coordinator.cancel());
    assert_eq!(
        coordinator.view().last_error.as_deref(),
        Some("request cancelled")
    );

    // The stalled reply lands with nobody waiting for it.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(coordinator.dataset().is_empty());

    let loaded = coordinator.load(Some(people())).await.expect("load after drop");
    assert_eq!(loaded.len(), 3);
}

#[tokio::test]
async fn timed_out_request_discards_late_reply() {
    init_logging();
    let transform = SlowFirstTransform {
        stalled: AtomicBool::new(false),
        delay: Duration::from_millis(300),
    };
    let coordinator = Coordinator::with_transform(
        CoordinatorSettings {
            request_timeout_ms: Some(50),
            ..settings()
        },
        Arc::new(transform),
    );

    let err = coordinator.load(Some(people())).await.unwrap_err();
    assert_eq!(err, PipelineError::Timeout(Duration::from_millis(50)));
    assert_eq!(err.category(), ErrorCategory::Abandoned);
    assert!(coordinator.dataset().is_empty());

    // Let the stalled reply arrive with nobody waiting for it.
    tokio::time::sleep(Duration::from_millis(400)).await;

    let loaded = coordinator.load(Some(people())).await.expect("second load");
    assert_eq!(loaded.len(), 3);
    assert_eq!(coordinator.view().last_error, None);
}

#[tokio::test]
async fn cancel_abandons_the_request_in_flight() {
    init_logging();
    let (transform, release) = GatedTransform::new();
    let coordinator = Coordinator::with_transform(settings(), Arc::new(transform));
    assert!(!coordinator.cancel());

    let (result, cancelled) = tokio::join!(coordinator.load(Some(people())), async {
        wait_until_busy(&coordinator).await;
        coordinator.cancel()
    });

    assert!(cancelled);
    assert_eq!(result.unwrap_err(), PipelineError::Cancelled);
    assert!(!coordinator.is_busy());
    assert!(coordinator.dataset().is_empty());

    // Unblocks the abandoned request, then the next one.
    release.send(()).expect("release abandoned");
    release.send(()).expect("release next");
    let loaded = coordinator.load(Some(people())).await.expect("load");
    assert_eq!(loaded.len(), 3);
}

#[tokio::test]
async fn missing_background_support_fails_by_default() {
    init_logging();
    let coordinator = Coordinator::new(CoordinatorSettings {
        background: false,
        ..settings()
    });

    let err = coordinator.load(Some(people())).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transport);
    assert!(matches!(err, PipelineError::TransportUnavailable(_)));

    // The transport stays unavailable.
    let again = coordinator.load(Some(people())).await.unwrap_err();
    assert!(matches!(again, PipelineError::TransportUnavailable(_)));
}

#[tokio::test]
async fn inline_fallback_runs_on_the_calling_thread() {
    init_logging();
    let coordinator = Coordinator::new(CoordinatorSettings {
        background: false,
        fallback: FallbackPolicy::Inline,
        ..settings()
    });

    coordinator.load(Some(people())).await.expect("load");
    let filtered = coordinator.filter("carol").await.expect("filter");

    assert_eq!(*filtered, vec![json!({"id": 3, "name": "Carol"})]);
    let timings = coordinator.last_timings().expect("timings");
    assert_eq!(timings.threads, 1);
    assert_eq!(timings.communication, Duration::ZERO);
    assert!(timings.blocking >= timings.worker_processing);
    assert!(timings.blocking <= timings.total);
}

#[tokio::test]
async fn loads_from_a_path_and_reports_read_time() {
    init_logging();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(br#"[{"name": "Zed"}, {"name": "amy"}]"#)
        .expect("write");

    let coordinator = Coordinator::new(settings());
    let loaded = coordinator
        .load(Some(FileHandle::from_path(file.path())))
        .await
        .expect("load");
    assert_eq!(loaded.len(), 2);
    assert!(coordinator.last_timings().expect("timings").file_read.is_some());

    let sorted = coordinator.sort().await.expect("sort");
    assert_eq!(sorted[0], json!({"name": "amy"}));
}

#[tokio::test]
async fn unreadable_path_is_a_transport_error() {
    init_logging();
    let dir = tempfile::tempdir().expect("temp dir");
    let coordinator = Coordinator::new(settings());

    let err = coordinator
        .load(Some(FileHandle::from_path(dir.path().join("missing.json"))))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::FileRead(_)));
    assert!(!coordinator.is_busy());
}

#[tokio::test]
async fn shutdown_then_reuse_starts_a_new_worker() {
    init_logging();
    let coordinator = Coordinator::new(settings());
    coordinator.load(Some(people())).await.expect("load");

    coordinator.shutdown();

    let sorted = coordinator.sort().await.expect("sort after shutdown");
    assert_eq!(sorted[0]["name"], json!("Ann"));
}
