//! Task descriptors and lifecycle records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::executor::{task_fn, TaskExecutable, TaskOutput};
use super::AppResult;

/// Task identifier. Callers may supply one; otherwise it is generated.
pub type TaskId = String;

/// Lifecycle status of a task.
///
/// `Pending -> Running -> {Completed | Failed}` or `Pending -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, waiting for dependencies, resources or a concurrency slot.
    Pending,
    /// Executable is in flight.
    Running,
    /// Executable returned successfully.
    Completed,
    /// Executable returned an error or panicked.
    Failed,
    /// Removed from the queue before it started.
    Cancelled,
}

impl TaskStatus {
    /// Whether the task can no longer change status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A task as submitted to the scheduler.
pub struct TaskSpec {
    /// Caller-chosen id; generated when `None`.
    pub id: Option<TaskId>,
    /// Display name.
    pub name: String,
    /// Work to run. A missing executable fails the task when it is dispatched.
    pub executable: Option<Box<dyn TaskExecutable>>,
    /// Higher runs first among ready tasks.
    pub priority: i32,
    /// Tasks that must complete before this one may start.
    pub dependencies: Vec<TaskId>,
    /// Entries of the scheduler's resource gate this task holds while running.
    pub resource_requirements: Vec<String>,
    /// Expected run time, used for critical-path ordering.
    pub estimated_duration_ms: u64,
    /// Optional deadline in milliseconds since epoch.
    pub deadline_ms: Option<u128>,
}

impl TaskSpec {
    /// Create a task running `executable`.
    pub fn new(name: impl Into<String>, executable: impl TaskExecutable) -> Self {
        Self {
            executable: Some(Box::new(executable)),
            ..Self::without_executable(name)
        }
    }

    /// Create a task running a zero-argument async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = AppResult<TaskOutput>> + Send + 'static,
    {
        Self::new(name, task_fn(f))
    }

    /// Create a task with no executable.
    pub fn without_executable(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            executable: None,
            priority: 0,
            dependencies: Vec::new(),
            resource_requirements: Vec::new(),
            estimated_duration_ms: 0,
            deadline_ms: None,
        }
    }

    /// Use a caller-chosen id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a prerequisite task.
    #[must_use]
    pub fn depends_on(mut self, id: impl Into<TaskId>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Replace the prerequisite list.
    #[must_use]
    pub fn with_dependencies<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Add a required resource.
    #[must_use]
    pub fn requires(mut self, resource: impl Into<String>) -> Self {
        self.resource_requirements.push(resource.into());
        self
    }

    /// Set the estimated duration.
    #[must_use]
    pub const fn with_estimated_duration_ms(mut self, duration_ms: u64) -> Self {
        self.estimated_duration_ms = duration_ms;
        self
    }

    /// Set the deadline.
    #[must_use]
    pub const fn with_deadline_ms(mut self, deadline_ms: u128) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_executable", &self.executable.is_some())
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("resource_requirements", &self.resource_requirements)
            .field("estimated_duration_ms", &self.estimated_duration_ms)
            .field("deadline_ms", &self.deadline_ms)
            .finish()
    }
}

/// Read-only view of a task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub id: TaskId,
    /// Display name.
    pub name: String,
    /// Submission priority.
    pub priority: i32,
    /// Prerequisite task ids.
    pub dependencies: Vec<TaskId>,
    /// Required gate resources.
    pub resource_requirements: Vec<String>,
    /// Estimated duration in milliseconds.
    pub estimated_duration_ms: u64,
    /// Optional deadline in milliseconds since epoch.
    pub deadline_ms: Option<u128>,
    /// Current status.
    pub status: TaskStatus,
    /// Submission time.
    pub scheduled_at_ms: u128,
    /// Dispatch time.
    pub started_at_ms: Option<u128>,
    /// Time the task reached `Completed` or `Failed`.
    pub completed_at_ms: Option<u128>,
    /// Value returned by a completed task.
    pub result: Option<TaskOutput>,
    /// Error recorded for a failed task.
    pub error: Option<String>,
}

impl TaskSnapshot {
    /// Time between start and completion, once both are known.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        let started = self.started_at_ms?;
        let completed = self.completed_at_ms?;
        u64::try_from(completed.saturating_sub(started)).ok()
    }
}

/// Scheduler-owned record: the snapshot plus the not-yet-taken executable.
pub(crate) struct TaskRecord {
    pub(crate) info: TaskSnapshot,
    pub(crate) executable: Option<Box<dyn TaskExecutable>>,
    /// Submission order, the final ordering tie-break.
    pub(crate) seq: u64,
}

impl TaskRecord {
    pub(crate) fn from_spec(id: TaskId, spec: TaskSpec, seq: u64, now_ms: u128) -> Self {
        Self {
            info: TaskSnapshot {
                id,
                name: spec.name,
                priority: spec.priority,
                dependencies: spec.dependencies,
                resource_requirements: spec.resource_requirements,
                estimated_duration_ms: spec.estimated_duration_ms,
                deadline_ms: spec.deadline_ms,
                status: TaskStatus::Pending,
                scheduled_at_ms: now_ms,
                started_at_ms: None,
                completed_at_ms: None,
                result: None,
                error: None,
            },
            executable: spec.executable,
            seq,
        }
    }
}
