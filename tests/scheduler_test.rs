//! Integration tests for the dependency-aware scheduler running on tokio.
//!
//! Validates:
//! 1. Prerequisites complete before dependents start
//! 2. Failed prerequisites leave dependents blocked
//! 3. The concurrency limit and the resource gate are honoured
//! 4. Cycles are cancelled by the periodic scan, diamonds are not
//! 5. Executable errors and panics become task failures

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus_orchestrator::config::SchedulerConfig;
use prometheus_orchestrator::core::{
    task_fn_with_context, OrchestratorEvent, Scheduler, TaskSpec, TaskStatus,
};
use prometheus_orchestrator::runtime::TokioSpawner;
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn scheduler(config: SchedulerConfig) -> Scheduler<TokioSpawner> {
    Scheduler::new(config, TokioSpawner::current()).unwrap()
}

fn no_scan() -> SchedulerConfig {
    SchedulerConfig {
        enable_deadlock_detection: false,
        ..SchedulerConfig::default()
    }
}

/// Tracks how many tasks run at once.
#[derive(Clone, Default)]
struct Gauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    fn task(&self, name: &str, hold: Duration) -> TaskSpec {
        let gauge = self.clone();
        TaskSpec::from_fn(name, move || async move {
            let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(hold).await;
            gauge.current.fetch_sub(1, Ordering::SeqCst);
            Ok(json!(null))
        })
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dependency_completes_before_dependent_starts() {
    let s = scheduler(no_scan());
    let log = Arc::new(Mutex::new(Vec::new()));

    let slow_log = log.clone();
    let fetch = s.submit(TaskSpec::from_fn("fetch", move || async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        slow_log.lock().push("fetch");
        Ok(json!("rows"))
    }));

    let probe = s.clone();
    let dep = fetch.clone();
    let index_log = log.clone();
    let index = s.submit(
        TaskSpec::new(
            "index",
            task_fn_with_context(move |_ctx| async move {
                let upstream = probe.task(&dep).map(|t| t.status);
                index_log.lock().push("index");
                Ok(json!({ "upstream": upstream }))
            }),
        )
        .depends_on(fetch.clone())
        .with_priority(100),
    );

    s.start();
    let done = s.wait_for(&index, WAIT).await.unwrap();

    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.result, Some(json!({ "upstream": "completed" })));
    assert_eq!(*log.lock(), vec!["fetch", "index"]);
    let fetched = s.task(&fetch).unwrap();
    assert!(fetched.completed_at_ms.unwrap() <= done.started_at_ms.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_dependency_blocks_dependents() {
    let s = scheduler(no_scan());
    let upstream = s.submit(TaskSpec::from_fn("upstream", || async {
        Err(anyhow::anyhow!("vendor unavailable"))
    }));
    let downstream = s.submit(
        TaskSpec::from_fn("downstream", || async { Ok(json!(1)) }).depends_on(upstream.clone()),
    );
    s.start();

    let failed = s.wait_for(&upstream, WAIT).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("vendor unavailable"));

    let blocked = s
        .wait_for(&downstream, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(blocked.status, TaskStatus::Pending);
    assert_eq!(s.queue_order(), vec![downstream]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_limit_is_respected() {
    let s = scheduler(SchedulerConfig {
        max_concurrent: 2,
        ..no_scan()
    });
    let gauge = Gauge::default();
    let ids: Vec<_> = (0..6)
        .map(|i| s.submit(gauge.task(&format!("job-{i}"), Duration::from_millis(20))))
        .collect();
    s.start();

    for id in &ids {
        assert_eq!(s.wait_for(id, WAIT).await.unwrap().status, TaskStatus::Completed);
    }
    assert!(gauge.peak() <= 2, "peak concurrency {}", gauge.peak());
    let stats = s.stats();
    assert_eq!(stats.completed, 6);
    assert_eq!(stats.executing, 0);
    assert_eq!(stats.queue_size, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resource_gate_serializes_holders() {
    let s = scheduler(no_scan());
    s.set_resource_available("gpu", true);
    let gauge = Gauge::default();
    let a = s.submit(gauge.task("a", Duration::from_millis(20)).requires("gpu"));
    let b = s.submit(gauge.task("b", Duration::from_millis(20)).requires("gpu"));
    let never = s.submit(gauge.task("never", Duration::ZERO).requires("tpu"));
    s.start();

    assert_eq!(s.wait_for(&a, WAIT).await.unwrap().status, TaskStatus::Completed);
    assert_eq!(s.wait_for(&b, WAIT).await.unwrap().status, TaskStatus::Completed);
    assert_eq!(gauge.peak(), 1);
    assert_eq!(s.resource_available("gpu"), Some(true));
    assert_eq!(s.task(&never).unwrap().status, TaskStatus::Pending);

    s.set_resource_available("tpu", true);
    assert_eq!(s.wait_for(&never, WAIT).await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_periodic_scan_cancels_cycle_but_not_diamond() {
    let s = scheduler(SchedulerConfig {
        deadlock_check_interval_ms: 20,
        ..SchedulerConfig::default()
    });
    let mut events = s.events().subscribe();

    let a = s.submit(TaskSpec::from_fn("a", || async { Ok(json!("a")) }).with_id("a").depends_on("b"));
    let b = s.submit(TaskSpec::from_fn("b", || async { Ok(json!("b")) }).with_id("b").depends_on("a"));

    let c = s.submit(TaskSpec::from_fn("c", || async { Ok(json!("c")) }).with_id("c"));
    let l = s.submit(TaskSpec::from_fn("l", || async { Ok(json!("l")) }).with_id("l").depends_on("c"));
    let r = s.submit(TaskSpec::from_fn("r", || async { Ok(json!("r")) }).with_id("r").depends_on("c"));
    let d = s.submit(
        TaskSpec::from_fn("d", || async { Ok(json!("d")) })
            .with_id("d")
            .with_dependencies(["l", "r"]),
    );
    s.start();

    assert_eq!(s.wait_for(&a, WAIT).await.unwrap().status, TaskStatus::Cancelled);
    assert_eq!(s.wait_for(&b, WAIT).await.unwrap().status, TaskStatus::Cancelled);
    for id in [&c, &l, &r, &d] {
        assert_eq!(s.wait_for(id, WAIT).await.unwrap().status, TaskStatus::Completed);
    }

    let mut detected = Vec::new();
    while detected.len() < 2 {
        let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
        if let OrchestratorEvent::DeadlockDetected { task_id } = event {
            detected.push(task_id);
        }
    }
    detected.sort();
    assert_eq!(detected, vec!["a", "b"]);
    s.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panics_and_missing_executables_fail_the_task() {
    let s = scheduler(no_scan());
    let panicky = s.submit(TaskSpec::from_fn("panicky", || async {
        if true {
            panic!("model weights corrupt");
        }
        Ok(json!(null))
    }));
    let empty = s.submit(TaskSpec::without_executable("empty"));
    let after = s.submit(TaskSpec::from_fn("after", || async { Ok(json!("still running")) }));
    s.start();

    let failed = s.wait_for(&panicky, WAIT).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.unwrap().contains("model weights corrupt"));

    let missing = s.wait_for(&empty, WAIT).await.unwrap();
    assert_eq!(missing.error.as_deref(), Some("task has no executable"));

    let ok = s.wait_for(&after, WAIT).await.unwrap();
    assert_eq!(ok.status, TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lifecycle_events_in_order() {
    let s = scheduler(no_scan());
    let mut rx = s.events().subscribe();
    s.start();
    let id = s.submit(TaskSpec::from_fn("one", || async { Ok(json!(7)) }));
    s.wait_for(&id, WAIT).await.unwrap();

    let mut names = Vec::new();
    while names.len() < 4 {
        let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        names.push(event.name());
        if let OrchestratorEvent::TaskCompleted { result, .. } = &event {
            assert_eq!(result, &json!(7));
        }
    }
    assert_eq!(
        names,
        vec!["scheduler:started", "task:scheduled", "task:started", "task:completed"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_lets_running_tasks_finish() {
    let s = scheduler(no_scan());
    s.start();
    let (release, gate) = tokio::sync::oneshot::channel::<()>();
    let running = s.submit(TaskSpec::from_fn("long", move || async move {
        let _ = gate.await;
        Ok(json!("finished"))
    }));
    assert_eq!(s.task(&running).unwrap().status, TaskStatus::Running);

    s.stop();
    assert!(!s.is_running());
    let parked = s.submit(TaskSpec::from_fn("parked", || async { Ok(json!(null)) }));
    assert!(!s.cancel(&running));

    release.send(()).unwrap();
    assert_eq!(s.wait_for(&running, WAIT).await.unwrap().status, TaskStatus::Completed);
    assert_eq!(s.task(&parked).unwrap().status, TaskStatus::Pending);

    s.start();
    assert_eq!(s.wait_for(&parked, WAIT).await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resubmitting_running_id_gets_fresh_id() {
    let s = scheduler(no_scan());
    s.start();
    let (release, gate) = tokio::sync::oneshot::channel::<()>();
    let first = s.submit(
        TaskSpec::from_fn("first", move || async move {
            let _ = gate.await;
            Ok(json!(1))
        })
        .with_id("job"),
    );
    let second = s.submit(TaskSpec::from_fn("second", || async { Ok(json!(2)) }).with_id("job"));

    assert_eq!(first, "job");
    assert_ne!(second, "job");
    release.send(()).unwrap();
    assert_eq!(s.wait_for(&first, WAIT).await.unwrap().result, Some(json!(1)));
    assert_eq!(s.wait_for(&second, WAIT).await.unwrap().result, Some(json!(2)));
}

#[tokio::test]
async fn test_wait_for_times_out_with_latest_snapshot() {
    let s = scheduler(no_scan());
    let id = s.submit(TaskSpec::from_fn("idle", || async { Ok(json!(null)) }));
    let snapshot = s.wait_for(&id, Duration::from_millis(20)).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Pending);
    assert!(s.wait_for("missing", Duration::from_millis(1)).await.is_none());
}
