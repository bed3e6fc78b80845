//! Task execution traits and the spawning seam.

use std::future::Future;

use async_trait::async_trait;

use super::task::TaskId;
use super::AppResult;

/// Value produced by a successful task.
pub type TaskOutput = serde_json::Value;

/// Information handed to an executable when the scheduler invokes it.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Identifier of the task being executed.
    pub task_id: TaskId,
    /// Display name of the task.
    pub name: String,
    /// Start timestamp in milliseconds since epoch.
    pub started_at_ms: u128,
}

/// Opaque unit of work owned by the submitter.
///
/// The scheduler invokes an executable at most once. Errors and panics are
/// captured on the task record and never escape the dispatch loop.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_orchestrator::core::{AppResult, TaskContext, TaskExecutable, TaskOutput};
///
/// struct Provision {
///     region: String,
/// }
///
/// #[async_trait]
/// impl TaskExecutable for Provision {
///     async fn execute(self: Box<Self>, ctx: TaskContext) -> AppResult<TaskOutput> {
///         Ok(serde_json::json!({ "task": ctx.task_id, "region": self.region }))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutable: Send + 'static {
    /// Run the unit of work to completion.
    async fn execute(self: Box<Self>, ctx: TaskContext) -> AppResult<TaskOutput>;
}

/// Adapter running a zero-argument async closure. Built by [`task_fn`].
pub struct FnExecutable<F> {
    f: F,
}

/// Wrap a zero-argument async closure as a [`TaskExecutable`].
pub fn task_fn<F, Fut>(f: F) -> FnExecutable<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<TaskOutput>> + Send + 'static,
{
    FnExecutable { f }
}

#[async_trait]
impl<F, Fut> TaskExecutable for FnExecutable<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<TaskOutput>> + Send + 'static,
{
    async fn execute(self: Box<Self>, _ctx: TaskContext) -> AppResult<TaskOutput> {
        (self.f)().await
    }
}

/// Adapter running an async closure that receives the [`TaskContext`].
/// Built by [`task_fn_with_context`].
pub struct ContextFnExecutable<F> {
    f: F,
}

/// Wrap an async closure taking the [`TaskContext`] as a [`TaskExecutable`].
pub fn task_fn_with_context<F, Fut>(f: F) -> ContextFnExecutable<F>
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<TaskOutput>> + Send + 'static,
{
    ContextFnExecutable { f }
}

#[async_trait]
impl<F, Fut> TaskExecutable for ContextFnExecutable<F>
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<TaskOutput>> + Send + 'static,
{
    async fn execute(self: Box<Self>, ctx: TaskContext) -> AppResult<TaskOutput> {
        (self.f)(ctx).await
    }
}

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
