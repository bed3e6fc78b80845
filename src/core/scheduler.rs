//! Priority- and dependency-aware task scheduler.
//!
//! The scheduler keeps every submitted task for inspection and a queue of the
//! pending ones, ordered by priority (descending), deadline (ascending, none
//! last) and optionally critical-path length (descending). Dispatch scans the
//! queue front to back for the first task whose prerequisites have all
//! completed and whose gate resources are free, up to `max_concurrent`.
//!
//! Bookkeeping lives behind one `parking_lot::Mutex`. The lock is never held
//! across an executable's `.await` nor while events are emitted, so a task's
//! completion can re-enter dispatch from any worker thread.

use std::any::Any;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::events::{EventBus, OrchestratorEvent};
use crate::core::executor::{Spawn, TaskContext, TaskExecutable, TaskOutput};
use crate::core::graph::DependencyGraph;
use crate::core::task::{TaskId, TaskRecord, TaskSnapshot, TaskSpec, TaskStatus};
use crate::core::{AppResult, OrchestratorError};
use crate::util::clock::{Clock, SystemClock};
use crate::util::ids::{IdGenerator, UuidIdGenerator};

/// Counts by status, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Every task ever submitted.
    pub total_tasks: usize,
    /// Tasks waiting to start.
    pub pending: usize,
    /// Tasks in flight.
    pub running: usize,
    /// Tasks that finished successfully.
    pub completed: usize,
    /// Tasks whose executable failed.
    pub failed: usize,
    /// Tasks cancelled before starting.
    pub cancelled: usize,
    /// Current queue length.
    pub queue_size: usize,
    /// Tasks currently holding a concurrency slot.
    pub executing: usize,
    /// Configured concurrency limit.
    pub max_concurrent: usize,
}

struct SchedulerState {
    tasks: HashMap<TaskId, TaskRecord>,
    queue: Vec<TaskId>,
    /// Coarse gate: resource id -> free. Unknown ids are not free.
    resources: HashMap<String, bool>,
    executing: HashSet<TaskId>,
    running: bool,
    /// Bumped on every start/stop so stale scan loops exit.
    scan_generation: u64,
    next_seq: u64,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            queue: Vec::new(),
            resources: HashMap::new(),
            executing: HashSet::new(),
            running: false,
            scan_generation: 0,
            next_seq: 0,
        }
    }

    fn sort_queue(&mut self, critical_path: bool) {
        let mut queue = std::mem::take(&mut self.queue);
        let tasks = &self.tasks;

        let lengths = if critical_path {
            let mut graph = DependencyGraph::new();
            for record in tasks.values() {
                graph.add(
                    &record.info.id,
                    &record.info.dependencies,
                    record.info.estimated_duration_ms,
                );
            }
            graph.critical_path_lengths(
                queue
                    .iter()
                    .filter_map(|id| tasks.get(id).map(|r| r.info.id.as_str())),
            )
        } else {
            HashMap::new()
        };

        queue.sort_by_cached_key(|id| {
            let record = tasks.get(id);
            let path = lengths.get(id.as_str()).copied().unwrap_or(0);
            let priority = record.map_or(0, |r| r.info.priority);
            let deadline = record.and_then(|r| r.info.deadline_ms);
            let seq = record.map_or(u64::MAX, |r| r.seq);
            (
                Reverse(path),
                Reverse(priority),
                deadline.is_none(),
                deadline.unwrap_or(0),
                seq,
            )
        });

        self.queue = queue;
    }

    fn is_ready(&self, record: &TaskRecord) -> bool {
        if record.info.status != TaskStatus::Pending {
            return false;
        }
        let deps_done = record.info.dependencies.iter().all(|dep| {
            self.tasks
                .get(dep)
                .is_some_and(|d| d.info.status == TaskStatus::Completed)
        });
        deps_done
            && record
                .info
                .resource_requirements
                .iter()
                .all(|r| self.resources.get(r).copied().unwrap_or(false))
    }

    fn find_ready(&self) -> Option<usize> {
        self.queue.iter().position(|id| {
            self.tasks
                .get(id)
                .is_some_and(|record| self.is_ready(record))
        })
    }

    fn cancel(&mut self, id: &str) -> bool {
        let Some(record) = self.tasks.get_mut(id) else {
            return false;
        };
        match record.info.status {
            TaskStatus::Pending => {}
            TaskStatus::Running => {
                warn!(task_id = id, "cannot cancel running task");
                return false;
            }
            _ => return false,
        }
        record.info.status = TaskStatus::Cancelled;
        record.executable = None;
        self.queue.retain(|queued| queued != id);
        true
    }
}

struct Shared {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    events: EventBus,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    /// Signalled whenever a task changes status.
    progress: Notify,
    /// Wakes the deadlock scan loop on stop.
    scan_stop: Notify,
}

/// Dependency-aware scheduler. Cloning yields another handle to the same
/// scheduler.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_orchestrator::config::SchedulerConfig;
/// use prometheus_orchestrator::core::{Scheduler, TaskSpec};
/// use prometheus_orchestrator::runtime::TokioSpawner;
///
/// let scheduler = Scheduler::new(SchedulerConfig::default(), TokioSpawner::current())?;
/// scheduler.start();
/// let fetch = scheduler.submit(TaskSpec::from_fn("fetch", || async { Ok(json!(1)) }));
/// scheduler.submit(
///     TaskSpec::from_fn("index", || async { Ok(json!(2)) }).depends_on(fetch.clone()),
/// );
/// ```
pub struct Scheduler<S> {
    shared: Arc<Shared>,
    spawner: S,
}

impl<S: Clone> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<S> Scheduler<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a stopped scheduler with its own event bus, UUID ids and the
    /// system clock.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, OrchestratorError> {
        Self::with_components(
            config,
            spawner,
            EventBus::default(),
            Arc::new(UuidIdGenerator),
            Arc::new(SystemClock),
        )
    }

    /// Create a stopped scheduler from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the configuration is invalid.
    pub fn with_components(
        config: SchedulerConfig,
        spawner: S,
        events: EventBus,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OrchestratorError> {
        config.validate().map_err(OrchestratorError::InvalidConfig)?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(SchedulerState::new()),
                events,
                ids,
                clock,
                progress: Notify::new(),
                scan_stop: Notify::new(),
            }),
            spawner,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Event bus this scheduler emits on.
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Queue a task and try to dispatch. Returns the task id.
    ///
    /// Re-submitting the id of a task that is not running replaces it. If
    /// that task is running, the new submission gets a generated id instead.
    pub fn submit(&self, spec: TaskSpec) -> TaskId {
        let now = self.shared.clock.now_ms();
        let (id, event) = {
            let mut state = self.shared.state.lock();
            let mut id = spec
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| self.shared.ids.next_id());

            match state.tasks.get(&id).map(|r| r.info.status) {
                Some(TaskStatus::Running) => {
                    let fresh = self.shared.ids.next_id();
                    warn!(task_id = %id, new_id = %fresh, "task id in use by a running task");
                    id = fresh;
                }
                Some(_) => {
                    debug!(task_id = %id, "replacing existing task record");
                    state.queue.retain(|queued| *queued != id);
                }
                None => {}
            }

            let seq = state.next_seq;
            state.next_seq += 1;
            let record = TaskRecord::from_spec(id.clone(), spec, seq, now);
            let event = OrchestratorEvent::TaskScheduled {
                task_id: id.clone(),
                name: record.info.name.clone(),
                priority: record.info.priority,
            };
            info!(
                task_id = %id,
                name = %record.info.name,
                priority = record.info.priority,
                "scheduled task"
            );
            state.tasks.insert(id.clone(), record);
            state.queue.push(id.clone());
            state.sort_queue(self.shared.config.enable_critical_path);
            (id, event)
        };

        self.shared.events.emit(event);
        self.dispatch();
        id
    }

    /// Cancel a pending task. Returns `false` for unknown, running or
    /// already finished tasks.
    pub fn cancel(&self, id: &str) -> bool {
        let cancelled = self.shared.state.lock().cancel(id);
        if cancelled {
            info!(task_id = id, "cancelled task");
            self.shared.events.emit(OrchestratorEvent::TaskCancelled {
                task_id: id.to_string(),
            });
            self.shared.progress.notify_waiters();
        }
        cancelled
    }

    /// Enable dispatch and, if configured, the periodic deadlock scan.
    /// Runs a dispatch pass for work submitted while stopped.
    pub fn start(&self) {
        let generation = {
            let mut state = self.shared.state.lock();
            if state.running {
                return;
            }
            state.running = true;
            state.scan_generation += 1;
            state.scan_generation
        };

        info!(
            max_concurrent = self.shared.config.max_concurrent,
            critical_path = self.shared.config.enable_critical_path,
            "scheduler started"
        );
        self.shared.events.emit(OrchestratorEvent::SchedulerStarted);

        if self.shared.config.enable_deadlock_detection {
            self.spawn_deadlock_scan(generation);
        }
        self.dispatch();
    }

    /// Disable dispatch and stop the deadlock scan. Running tasks finish
    /// normally.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            state.scan_generation += 1;
        }
        self.shared.scan_stop.notify_waiters();
        info!("scheduler stopped");
        self.shared.events.emit(OrchestratorEvent::SchedulerStopped);
    }

    /// Whether dispatch is enabled.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Mark an entry of the coarse resource gate free or taken, then try to
    /// dispatch. Tasks requiring an id never set here never start.
    pub fn set_resource_available(&self, resource_id: impl Into<String>, available: bool) {
        let resource_id = resource_id.into();
        debug!(resource_id = %resource_id, available, "resource gate updated");
        self.shared
            .state
            .lock()
            .resources
            .insert(resource_id, available);
        if available {
            self.dispatch();
        }
    }

    /// Current gate value for a resource; `None` if it was never set.
    pub fn resource_available(&self, resource_id: &str) -> Option<bool> {
        self.shared.state.lock().resources.get(resource_id).copied()
    }

    /// Snapshot of one task.
    pub fn task(&self, id: &str) -> Option<TaskSnapshot> {
        self.shared
            .state
            .lock()
            .tasks
            .get(id)
            .map(|r| r.info.clone())
    }

    /// Snapshots of all tasks in submission order.
    pub fn tasks(&self) -> Vec<TaskSnapshot> {
        let state = self.shared.state.lock();
        let mut records: Vec<&TaskRecord> = state.tasks.values().collect();
        records.sort_by_key(|r| r.seq);
        records.into_iter().map(|r| r.info.clone()).collect()
    }

    /// Pending task ids in dispatch-scan order.
    pub fn queue_order(&self) -> Vec<TaskId> {
        self.shared.state.lock().queue.clone()
    }

    /// Counts by status.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        let mut stats = SchedulerStats {
            total_tasks: state.tasks.len(),
            queue_size: state.queue.len(),
            executing: state.executing.len(),
            max_concurrent: self.shared.config.max_concurrent,
            ..SchedulerStats::default()
        };
        for record in state.tasks.values() {
            match record.info.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Wait until a task reaches a terminal status or `timeout` elapses.
    /// Returns the latest snapshot, or `None` for unknown ids.
    pub async fn wait_for(&self, id: &str, timeout: Duration) -> Option<TaskSnapshot> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.progress.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let snapshot = self.task(id)?;
            if snapshot.status.is_terminal() {
                return Some(snapshot);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.task(id);
            }
        }
    }

    /// Cancel every pending task that sits on or behind a dependency cycle.
    /// Returns the cancelled ids in submission order.
    pub fn check_for_deadlocks(&self) -> Vec<TaskId> {
        let deadlocked: Vec<TaskId> = {
            let mut state = self.shared.state.lock();
            let found = {
                let mut graph = DependencyGraph::new();
                for record in state.tasks.values() {
                    graph.add(
                        &record.info.id,
                        &record.info.dependencies,
                        record.info.estimated_duration_ms,
                    );
                }

                let mut pending: Vec<&TaskRecord> = state
                    .tasks
                    .values()
                    .filter(|r| r.info.status == TaskStatus::Pending)
                    .collect();
                pending.sort_by_key(|r| r.seq);

                let mut acyclic = HashSet::new();
                pending
                    .into_iter()
                    .filter(|r| graph.reaches_cycle(&r.info.id, &mut acyclic))
                    .map(|r| r.info.id.clone())
                    .collect::<Vec<_>>()
            };
            found
                .into_iter()
                .filter(|id| state.cancel(id))
                .collect()
        };

        if deadlocked.is_empty() {
            return deadlocked;
        }
        for id in &deadlocked {
            warn!(task_id = %id, "deadlock detected, cancelling task");
            self.shared
                .events
                .emit(OrchestratorEvent::DeadlockDetected { task_id: id.clone() });
            self.shared
                .events
                .emit(OrchestratorEvent::TaskCancelled { task_id: id.clone() });
        }
        self.shared.progress.notify_waiters();
        deadlocked
    }

    fn spawn_deadlock_scan(&self, generation: u64) {
        let this = self.clone();
        let interval = Duration::from_millis(self.shared.config.deadlock_check_interval_ms);
        self.spawner.spawn(async move {
            debug!(generation, "deadlock scan loop started");
            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = this.shared.scan_stop.notified() => {}
                }
                if this.shared.state.lock().scan_generation != generation {
                    debug!(generation, "deadlock scan loop exiting");
                    break;
                }
                this.check_for_deadlocks();
            }
        });
    }

    /// Admit ready tasks until the concurrency limit is hit or none is ready.
    fn dispatch(&self) {
        loop {
            let (executable, ctx, event) = {
                let mut state = self.shared.state.lock();
                if !state.running
                    || state.executing.len() >= self.shared.config.max_concurrent
                    || state.queue.is_empty()
                {
                    return;
                }
                let Some(position) = state.find_ready() else {
                    return;
                };

                let id = state.queue.remove(position);
                let now = self.shared.clock.now_ms();
                let Some(record) = state.tasks.get_mut(&id) else {
                    continue;
                };
                record.info.status = TaskStatus::Running;
                record.info.started_at_ms = Some(now);
                let executable = record.executable.take();
                let requirements = record.info.resource_requirements.clone();
                let ctx = TaskContext {
                    task_id: id.clone(),
                    name: record.info.name.clone(),
                    started_at_ms: now,
                };
                for resource in requirements {
                    state.resources.insert(resource, false);
                }
                state.executing.insert(id.clone());

                let event = OrchestratorEvent::TaskStarted {
                    task_id: id,
                    name: ctx.name.clone(),
                };
                (executable, ctx, event)
            };

            info!(task_id = %ctx.task_id, name = %ctx.name, "executing task");
            self.shared.events.emit(event);
            self.shared.progress.notify_waiters();
            self.launch(executable, ctx);
        }
    }

    fn launch(&self, executable: Option<Box<dyn TaskExecutable>>, ctx: TaskContext) {
        let this = self.clone();
        self.spawner.spawn(async move {
            let task_id = ctx.task_id.clone();
            let outcome = match executable {
                Some(executable) => {
                    let run = async move { executable.execute(ctx).await };
                    match AssertUnwindSafe(run).catch_unwind().await {
                        Ok(result) => result,
                        Err(panic) => Err(anyhow::anyhow!(
                            "executable panicked: {}",
                            panic_message(panic.as_ref())
                        )),
                    }
                }
                None => Err(anyhow::anyhow!("task has no executable")),
            };
            this.finish(&task_id, outcome);
            this.dispatch();
        });
    }

    fn finish(&self, id: &str, outcome: AppResult<TaskOutput>) {
        let now = self.shared.clock.now_ms();
        let event = {
            let mut state = self.shared.state.lock();
            state.executing.remove(id);
            let Some(record) = state.tasks.get_mut(id) else {
                return;
            };
            record.info.completed_at_ms = Some(now);
            let duration_ms = record.info.duration_ms().unwrap_or(0);
            let requirements = record.info.resource_requirements.clone();
            let name = record.info.name.clone();

            let event = match outcome {
                Ok(result) => {
                    record.info.status = TaskStatus::Completed;
                    record.info.result = Some(result.clone());
                    info!(task_id = id, duration_ms, "task completed");
                    OrchestratorEvent::TaskCompleted {
                        task_id: id.to_string(),
                        name,
                        result,
                        duration_ms,
                    }
                }
                Err(error) => {
                    let error = format!("{error:#}");
                    record.info.status = TaskStatus::Failed;
                    record.info.error = Some(error.clone());
                    warn!(task_id = id, error = %error, "task failed");
                    OrchestratorEvent::TaskFailed {
                        task_id: id.to_string(),
                        name,
                        error,
                    }
                }
            };

            for resource in requirements {
                state.resources.insert(resource, true);
            }
            event
        };

        self.shared.events.emit(event);
        self.shared.progress.notify_waiters();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
