//! Tests for utility functions

use prometheus_orchestrator::util::{
    now_ms, Clock, IdGenerator, ManualClock, SequentialIdGenerator, SystemClock, UuidIdGenerator,
};

#[test]
fn test_manual_clock_advances_only_when_told() {
    let clock = ManualClock::new(1_000);
    assert_eq!(clock.now_ms(), 1_000);
    assert_eq!(clock.now_ms(), 1_000);

    clock.advance(250);
    assert_eq!(clock.now_ms(), 1_250);

    clock.set(10);
    assert_eq!(clock.now_ms(), 10);
}

#[test]
fn test_system_clock_tracks_wall_time() {
    let before = now_ms();
    let observed = SystemClock.now_ms();
    assert!(observed >= before);
}

#[test]
fn test_sequential_ids_per_prefix() {
    let tasks = SequentialIdGenerator::new("task");
    let resources = SequentialIdGenerator::new("res");
    assert_eq!(tasks.next_id(), "task-1");
    assert_eq!(resources.next_id(), "res-1");
    assert_eq!(tasks.next_id(), "task-2");
}

#[test]
fn test_uuid_ids_are_well_formed() {
    let id = UuidIdGenerator.next_id();
    assert_eq!(id.len(), 36);
    assert!(uuid::Uuid::parse_str(&id).is_ok());
}
