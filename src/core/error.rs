//! Error types for orchestration operations.

use thiserror::Error;

/// Errors produced by orchestrator components.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No resource is registered under the given id.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    /// Allocation requests must ask for at least one unit.
    #[error("invalid allocation amount for resource {resource_id}: {amount}")]
    InvalidAmount {
        /// Target resource.
        resource_id: String,
        /// Requested amount.
        amount: u64,
    },
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Runtime construction or spawning failed.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Application-facing result using anyhow for caller-supplied code.
pub type AppResult<T> = Result<T, anyhow::Error>;
