//! Tests for tokio spawner utilities and API models

use prometheus_orchestrator::core::{task_fn, Spawn, TaskSnapshot, TaskStatus};
use prometheus_orchestrator::runtime::tokio_spawner::TokioSpawner;
use prometheus_orchestrator::runtime::{TaskStatusResponse, TaskSubmission};
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test]
async fn test_try_current_inside_runtime() {
    assert!(TokioSpawner::try_current().is_ok());
}

#[test]
fn test_try_current_outside_runtime_is_error() {
    assert!(TokioSpawner::try_current().is_err());
}

#[test]
fn test_owned_runtime_spawner() {
    let spawner = TokioSpawner::with_worker_threads(2).expect("runtime");
    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(async move {
        tx.send("ran").unwrap();
    });
    let got = rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("spawned future ran");
    assert_eq!(got, "ran");
}

#[test]
fn test_task_submission_from_json() {
    let submission: TaskSubmission = serde_json::from_value(json!({
        "name": "index",
        "priority": 3,
        "dependencies": ["fetch"],
        "resource_requirements": ["gpu"],
        "estimated_duration_ms": 40
    }))
    .unwrap();

    let spec = submission.into_spec(task_fn(|| async { Ok(json!(null)) }));
    assert_eq!(spec.name, "index");
    assert_eq!(spec.id, None);
    assert_eq!(spec.priority, 3);
    assert_eq!(spec.dependencies, vec!["fetch"]);
    assert_eq!(spec.resource_requirements, vec!["gpu"]);
    assert_eq!(spec.estimated_duration_ms, 40);
    assert!(spec.executable.is_some());
}

#[test]
fn test_status_response_from_snapshot() {
    let snapshot = TaskSnapshot {
        id: "t1".into(),
        name: "fetch".into(),
        priority: 0,
        dependencies: Vec::new(),
        resource_requirements: Vec::new(),
        estimated_duration_ms: 0,
        deadline_ms: None,
        status: TaskStatus::Completed,
        scheduled_at_ms: 100,
        started_at_ms: Some(110),
        completed_at_ms: Some(150),
        result: Some(json!({"rows": 3})),
        error: None,
    };
    let response = TaskStatusResponse::from(snapshot);
    assert_eq!(response.task_id, "t1");
    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.duration_ms, Some(40));
    assert_eq!(response.result, Some(json!({"rows": 3})));
}
