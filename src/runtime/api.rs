//! API-facing request/response models for collaborators driving the
//! orchestrator over some transport they own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{
    AllocatorStats, AllocationOutcome, AllocationRequest, BreakerStats, Orchestrator,
    OrchestratorError, ResourceId, ResourceSpec, SchedulerStats, Spawn, TaskExecutable, TaskId,
    TaskSnapshot, TaskSpec, TaskStatus,
};

/// Task submission payload. The executable is supplied separately since it
/// is code, not data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSubmission {
    /// Optional caller-chosen id.
    pub id: Option<TaskId>,
    /// Display name.
    pub name: String,
    /// Higher runs first among ready tasks.
    pub priority: i32,
    /// Prerequisite task ids.
    pub dependencies: Vec<TaskId>,
    /// Required gate resources.
    pub resource_requirements: Vec<String>,
    /// Estimated duration in milliseconds.
    pub estimated_duration_ms: u64,
    /// Optional deadline (ms since epoch).
    pub deadline_ms: Option<u128>,
}

impl TaskSubmission {
    /// Combine with an executable into a schedulable task.
    pub fn into_spec(self, executable: impl TaskExecutable) -> TaskSpec {
        let mut spec = TaskSpec::new(self.name, executable)
            .with_priority(self.priority)
            .with_dependencies(self.dependencies)
            .with_estimated_duration_ms(self.estimated_duration_ms);
        spec.id = self.id;
        spec.resource_requirements = self.resource_requirements;
        spec.deadline_ms = self.deadline_ms;
        spec
    }
}

/// Resource registration payload.
pub type ResourceRegistration = ResourceSpec;

/// Task status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Task identifier.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Result of a completed task.
    pub result: Option<serde_json::Value>,
    /// Error of a failed task.
    pub error: Option<String>,
    /// Run time once finished.
    pub duration_ms: Option<u64>,
}

impl From<TaskSnapshot> for TaskStatusResponse {
    fn from(task: TaskSnapshot) -> Self {
        Self {
            duration_ms: task.duration_ms(),
            task_id: task.id,
            status: task.status,
            result: task.result,
            error: task.error,
        }
    }
}

/// Aggregate health payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorHealth {
    /// Scheduler running and no circuit open.
    pub ok: bool,
    /// Whether dispatch is enabled.
    pub scheduler_running: bool,
    /// Scheduler counts.
    pub scheduler: SchedulerStats,
    /// Allocator counters.
    pub allocator: AllocatorStats,
    /// Per-circuit statistics.
    pub circuits: BTreeMap<String, BreakerStats>,
    /// Names of open circuits.
    pub unhealthy_circuits: Vec<String>,
}

/// Submit a task built from `req` and `executable`.
pub fn submit_task<S>(
    orchestrator: &Orchestrator<S>,
    req: TaskSubmission,
    executable: impl TaskExecutable,
) -> TaskId
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    orchestrator.scheduler().submit(req.into_spec(executable))
}

/// Register a resource and return its id.
pub fn register_resource<S>(orchestrator: &Orchestrator<S>, req: ResourceRegistration) -> ResourceId
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    orchestrator.allocator().register(req)
}

/// Request an allocation.
///
/// # Errors
///
/// Propagates allocator errors for unknown resources or zero amounts.
pub fn request_allocation<S>(
    orchestrator: &Orchestrator<S>,
    req: AllocationRequest,
) -> Result<AllocationOutcome, OrchestratorError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    orchestrator.allocator().allocate(req)
}

/// Status of one task.
pub fn task_status<S>(orchestrator: &Orchestrator<S>, task_id: &str) -> Option<TaskStatusResponse>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    orchestrator.scheduler().task(task_id).map(Into::into)
}

/// Aggregate health of every component.
pub fn health<S>(orchestrator: &Orchestrator<S>) -> OrchestratorHealth
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    let scheduler_running = orchestrator.scheduler().is_running();
    let report = orchestrator.breakers().health();
    OrchestratorHealth {
        ok: scheduler_running && report.unhealthy.is_empty(),
        scheduler_running,
        scheduler: orchestrator.scheduler().stats(),
        allocator: orchestrator.allocator().stats(),
        circuits: orchestrator.breakers().stats(),
        unhealthy_circuits: report.unhealthy,
    }
}
