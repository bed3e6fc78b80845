//! Core scheduling, allocation and failure-isolation components.

pub mod allocator;
pub mod breaker_manager;
pub mod circuit_breaker;
pub mod error;
pub mod events;
pub mod executor;
pub mod graph;
pub mod orchestrator;
pub mod scheduler;
pub mod task;

pub use allocator::{
    Adjustment, AllocationOutcome, AllocationRequest, AllocatorStats, CapacityAction,
    CapacityRecommendation, ConsumerId, RebalanceReport, Resource, ResourceAllocator, ResourceId,
    ResourceSpec,
};
pub use breaker_manager::{CircuitBreakerManager, HealthReport, HealthStatus};
pub use circuit_breaker::{
    BreakerHooks, BreakerStats, CircuitBreaker, CircuitBreakerError, CircuitMode, CircuitState,
    FailurePredicate, Fallback,
};
pub use error::{AppResult, OrchestratorError};
pub use events::{EventBus, EventSink, OrchestratorEvent, DEFAULT_EVENT_BUFFER};
pub use executor::{
    task_fn, task_fn_with_context, ContextFnExecutable, FnExecutable, Spawn, TaskContext,
    TaskExecutable, TaskOutput,
};
pub use graph::DependencyGraph;
pub use orchestrator::Orchestrator;
pub use scheduler::{Scheduler, SchedulerStats};
pub use task::{TaskId, TaskSnapshot, TaskSpec, TaskStatus};
