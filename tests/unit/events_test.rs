//! Tests for event sinks

use std::sync::Arc;

use prometheus_orchestrator::core::{EventBus, EventSink, OrchestratorEvent};
use prometheus_orchestrator::infra::{InMemoryEventSink, TracingEventSink};

fn cancelled(id: &str) -> OrchestratorEvent {
    OrchestratorEvent::TaskCancelled {
        task_id: id.to_string(),
    }
}

#[test]
fn test_in_memory_sink_is_bounded() {
    let sink = InMemoryEventSink::new(2);
    sink.record(&cancelled("a"));
    sink.record(&cancelled("b"));
    sink.record(&cancelled("c"));

    assert_eq!(sink.len(), 2);
    assert_eq!(sink.events(), vec![cancelled("b"), cancelled("c")]);

    sink.clear();
    assert!(sink.is_empty());
}

#[test]
fn test_bus_feeds_multiple_sinks() {
    let bus = EventBus::new(16);
    let first = Arc::new(InMemoryEventSink::default());
    let second = Arc::new(InMemoryEventSink::default());
    bus.add_sink(first.clone());
    bus.add_sink(second.clone());
    bus.add_sink(Arc::new(TracingEventSink));

    bus.emit_all([
        OrchestratorEvent::SchedulerStarted,
        cancelled("t1"),
        OrchestratorEvent::SchedulerStopped,
    ]);

    let expected = vec!["scheduler:started", "task:cancelled", "scheduler:stopped"];
    assert_eq!(first.names(), expected);
    assert_eq!(second.names(), expected);
}

#[tokio::test]
async fn test_subscriber_receives_in_order() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    bus.emit(cancelled("a"));
    bus.emit(cancelled("b"));

    assert_eq!(rx.recv().await.unwrap(), cancelled("a"));
    assert_eq!(rx.recv().await.unwrap(), cancelled("b"));
}

#[test]
fn test_events_round_trip_through_json() {
    let event = OrchestratorEvent::CircuitStateChanged {
        name: "vendor".into(),
        from: prometheus_orchestrator::core::CircuitMode::Closed,
        to: prometheus_orchestrator::core::CircuitMode::Open,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains(r#""event":"circuit_state_changed""#), "{json}");
    assert!(json.contains(r#""to":"open""#), "{json}");
    let back: OrchestratorEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}
