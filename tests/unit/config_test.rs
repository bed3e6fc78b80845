//! Tests for configuration validation and loading

use std::collections::HashMap;

use prometheus_orchestrator::config::{
    AllocationStrategy, AllocatorConfig, CircuitBreakerConfig, OrchestratorConfig, SchedulerConfig,
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_match_documented_values() {
    let cfg = OrchestratorConfig::default();
    assert_eq!(cfg.scheduler.max_concurrent, 10);
    assert!(cfg.scheduler.enable_critical_path);
    assert!(cfg.scheduler.enable_deadlock_detection);
    assert_eq!(cfg.scheduler.deadlock_check_interval_ms, 5_000);
    assert!((cfg.allocator.overcommit_ratio - 1.0).abs() < f64::EPSILON);
    assert_eq!(cfg.allocator.strategy, AllocationStrategy::Fair);
    assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
    assert_eq!(cfg.circuit_breaker.success_threshold, 2);
    assert_eq!(cfg.circuit_breaker.timeout_ms, 60_000);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_zero_interval_only_matters_when_enabled() {
    let mut cfg = SchedulerConfig {
        deadlock_check_interval_ms: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
    cfg.enable_deadlock_detection = false;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_allocator_config_rejects_ratio_below_one() {
    for ratio in [0.5, f64::NAN, f64::INFINITY] {
        let cfg = AllocatorConfig {
            overcommit_ratio: ratio,
            ..AllocatorConfig::default()
        };
        assert!(cfg.validate().is_err(), "ratio {ratio} accepted");
    }
}

#[test]
fn test_breaker_config_rejects_zero_thresholds() {
    let zero_failures = CircuitBreakerConfig {
        failure_threshold: 0,
        ..CircuitBreakerConfig::default()
    };
    let zero_timeout = CircuitBreakerConfig {
        timeout_ms: 0,
        ..CircuitBreakerConfig::default()
    };
    assert!(zero_failures.validate().is_err());
    assert!(zero_timeout.validate().is_err());
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = OrchestratorConfig::from_json_str(
        r#"{ "scheduler": { "max_concurrent": 4 }, "allocator": { "strategy": "priority" } }"#,
    )
    .unwrap();
    assert_eq!(cfg.scheduler.max_concurrent, 4);
    assert!(cfg.scheduler.enable_critical_path);
    assert_eq!(cfg.allocator.strategy, AllocationStrategy::Priority);
    assert_eq!(cfg.circuit_breaker, CircuitBreakerConfig::default());
}

#[test]
fn test_from_json_str_validates() {
    let err = OrchestratorConfig::from_json_str(r#"{ "scheduler": { "max_concurrent": 0 } }"#)
        .unwrap_err();
    assert!(err.contains("max_concurrent"), "{err}");

    let err = OrchestratorConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"), "{err}");
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = OrchestratorConfig::from_lookup(lookup(&[
        ("ORCHESTRATOR_MAX_CONCURRENT", "3"),
        ("ORCHESTRATOR_ENABLE_CRITICAL_PATH", "false"),
        ("ORCHESTRATOR_OVERCOMMIT_RATIO", "1.25"),
        ("ORCHESTRATOR_ALLOCATION_STRATEGY", "Priority"),
        ("ORCHESTRATOR_BREAKER_TIMEOUT_MS", " 250 "),
    ]))
    .unwrap();

    assert_eq!(cfg.scheduler.max_concurrent, 3);
    assert!(!cfg.scheduler.enable_critical_path);
    assert!((cfg.allocator.overcommit_ratio - 1.25).abs() < f64::EPSILON);
    assert_eq!(cfg.allocator.strategy, AllocationStrategy::Priority);
    assert_eq!(cfg.circuit_breaker.timeout_ms, 250);
    assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
}

#[test]
fn test_from_lookup_reports_bad_values() {
    let err = OrchestratorConfig::from_lookup(lookup(&[("ORCHESTRATOR_MAX_CONCURRENT", "many")]))
        .unwrap_err();
    assert!(err.contains("ORCHESTRATOR_MAX_CONCURRENT"), "{err}");

    let err = OrchestratorConfig::from_lookup(lookup(&[("ORCHESTRATOR_OVERCOMMIT_RATIO", "0.5")]))
        .unwrap_err();
    assert!(err.contains("overcommit_ratio"), "{err}");
}

#[test]
fn test_strategy_parse_and_display() {
    assert_eq!("fair".parse::<AllocationStrategy>(), Ok(AllocationStrategy::Fair));
    assert!("weighted".parse::<AllocationStrategy>().is_err());
    assert_eq!(AllocationStrategy::Priority.to_string(), "priority");
}
