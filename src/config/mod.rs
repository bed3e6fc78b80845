//! Configuration models for the scheduler, allocator and circuit breakers.

pub mod orchestrator;

pub use orchestrator::{
    AllocationStrategy, AllocatorConfig, CircuitBreakerConfig, OrchestratorConfig, SchedulerConfig,
};
