//! Tests for builder modules

use std::sync::Arc;

use prometheus_orchestrator::builders::OrchestratorBuilder;
use prometheus_orchestrator::config::{OrchestratorConfig, SchedulerConfig};
use prometheus_orchestrator::core::{ResourceSpec, TaskSpec};
use prometheus_orchestrator::infra::InMemoryEventSink;
use prometheus_orchestrator::runtime::TokioSpawner;
use prometheus_orchestrator::util::{ManualClock, SequentialIdGenerator};

#[tokio::test]
async fn test_builder_wires_shared_collaborators() {
    let sink = Arc::new(InMemoryEventSink::new(64));
    let orchestrator = OrchestratorBuilder::new(OrchestratorConfig::default())
        .with_id_generator(Arc::new(SequentialIdGenerator::new("id")))
        .with_clock(Arc::new(ManualClock::new(5_000)))
        .with_event_sink(sink.clone())
        .build(TokioSpawner::current())
        .unwrap();

    let task = orchestrator
        .scheduler()
        .submit(TaskSpec::without_executable("idle"));
    let resource = orchestrator
        .allocator()
        .register(ResourceSpec::new("gpu", "gpu", 4));

    assert_eq!(task, "id-1");
    assert_eq!(resource, "id-2");
    assert_eq!(
        orchestrator.scheduler().task(&task).unwrap().scheduled_at_ms,
        5_000
    );
    assert_eq!(sink.names(), vec!["task:scheduled", "resource:registered"]);
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let config = OrchestratorConfig {
        scheduler: SchedulerConfig {
            max_concurrent: 0,
            ..SchedulerConfig::default()
        },
        ..OrchestratorConfig::default()
    };
    let result = OrchestratorBuilder::new(config).build(TokioSpawner::current());
    assert!(result.is_err());
}
