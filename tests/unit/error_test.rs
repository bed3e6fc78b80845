//! Tests for error types

use prometheus_orchestrator::core::{CircuitBreakerError, OrchestratorError};

#[test]
fn test_resource_not_found_error() {
    let err = OrchestratorError::ResourceNotFound("gpu-0".to_string());
    assert_eq!(format!("{}", err), "resource not found: gpu-0");
}

#[test]
fn test_invalid_amount_error() {
    let err = OrchestratorError::InvalidAmount {
        resource_id: "gpu-0".to_string(),
        amount: 0,
    };
    assert_eq!(
        format!("{}", err),
        "invalid allocation amount for resource gpu-0: 0"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = OrchestratorError::InvalidConfig("max_concurrent must be greater than 0".into());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_concurrent must be greater than 0"
    );
}

#[test]
fn test_runtime_error() {
    let err = OrchestratorError::Runtime("no reactor running".to_string());
    assert_eq!(format!("{}", err), "runtime error: no reactor running");
}

#[test]
fn test_circuit_open_error() {
    let err = CircuitBreakerError::Open {
        name: "vendor".to_string(),
    };
    assert_eq!(format!("{}", err), "circuit `vendor` is open");
    assert!(err.is_open());
}

#[test]
fn test_circuit_call_error_keeps_context_chain() {
    let source = anyhow::anyhow!("connection reset").context("fetching invoice");
    let err = CircuitBreakerError::Call(source);
    assert_eq!(
        format!("{}", err),
        "call failed: fetching invoice: connection reset"
    );
    assert!(!err.is_open());
}

#[test]
fn test_fallback_error_counts_as_open() {
    let err = CircuitBreakerError::Fallback {
        name: "vendor".to_string(),
        error: anyhow::anyhow!("cache miss"),
    };
    assert!(err.is_open());
    assert_eq!(
        format!("{}", err),
        "fallback for circuit `vendor` failed: cache miss"
    );
}
