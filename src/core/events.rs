//! Notification stream shared by the scheduler, allocator and circuit breakers.
//!
//! Components never call listeners while holding their own locks: they collect
//! events during a state change and hand them to the [`EventBus`] afterwards.
//! Listeners either subscribe to the broadcast channel or register an
//! [`EventSink`] that is invoked synchronously on emission.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::core::allocator::AllocationRequest;
use crate::core::circuit_breaker::CircuitMode;

/// Default broadcast buffer for an [`EventBus`].
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Named notification raised by an orchestrator component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Dispatch and deadlock scanning were enabled.
    SchedulerStarted,
    /// Dispatch and deadlock scanning were disabled.
    SchedulerStopped,
    /// A task was accepted into the queue.
    TaskScheduled {
        /// Task identifier.
        task_id: String,
        /// Display name.
        name: String,
        /// Submission priority.
        priority: i32,
    },
    /// A task left the queue and its executable was invoked.
    TaskStarted {
        /// Task identifier.
        task_id: String,
        /// Display name.
        name: String,
    },
    /// A task's executable returned successfully.
    TaskCompleted {
        /// Task identifier.
        task_id: String,
        /// Display name.
        name: String,
        /// Value produced by the executable.
        result: serde_json::Value,
        /// Wall time between start and completion.
        duration_ms: u64,
    },
    /// A task's executable returned an error or panicked.
    TaskFailed {
        /// Task identifier.
        task_id: String,
        /// Display name.
        name: String,
        /// Rendered error.
        error: String,
    },
    /// A pending task was cancelled.
    TaskCancelled {
        /// Task identifier.
        task_id: String,
    },
    /// A pending task sits on or behind a dependency cycle.
    DeadlockDetected {
        /// Task identifier.
        task_id: String,
    },
    /// A resource was added to the allocator.
    ResourceRegistered {
        /// Resource identifier.
        resource_id: String,
        /// Display name.
        name: String,
        /// Type tag.
        kind: String,
        /// Total capacity in units.
        capacity: u64,
    },
    /// A resource was removed from the allocator.
    ResourceUnregistered {
        /// Resource identifier.
        resource_id: String,
        /// Allocations still held when it was removed.
        active_allocations: usize,
    },
    /// A rebalance pass finished for a resource.
    ResourceRebalanced {
        /// Resource identifier.
        resource_id: String,
        /// Per-consumer share the pass clamped to.
        fair_share: u64,
        /// Units returned to `available`.
        reclaimed: u64,
    },
    /// Capacity was granted to a consumer.
    AllocationCompleted {
        /// The granted request.
        request: AllocationRequest,
        /// Available units before the grant.
        available_before: i64,
        /// Available units after the grant.
        available_after: i64,
        /// Whether the grant went beyond nominal capacity.
        overcommitted: bool,
    },
    /// A request was refused outright.
    AllocationRejected {
        /// The refused request.
        request: AllocationRequest,
        /// Machine-readable reason.
        reason: String,
    },
    /// A request could not be satisfied and was parked.
    AllocationQueued {
        /// The parked request.
        request: AllocationRequest,
        /// Pending requests after queueing.
        pending: usize,
    },
    /// A consumer's allocation was changed by a rebalance.
    AllocationAdjusted {
        /// Consumer identifier.
        consumer_id: String,
        /// Resource identifier.
        resource_id: String,
        /// Units held before.
        from: u64,
        /// Units held after.
        to: u64,
    },
    /// A consumer released its allocation.
    DeallocationCompleted {
        /// Consumer identifier.
        consumer_id: String,
        /// Resource identifier.
        resource_id: String,
        /// Units returned.
        amount: u64,
        /// Available units before the release.
        available_before: i64,
        /// Available units after the release.
        available_after: i64,
    },
    /// A circuit moved between modes.
    CircuitStateChanged {
        /// Protected call-site name.
        name: String,
        /// Previous mode.
        from: CircuitMode,
        /// New mode.
        to: CircuitMode,
    },
    /// A protected call succeeded.
    CircuitCallSuccess {
        /// Protected call-site name.
        name: String,
        /// Mode after the outcome was applied.
        mode: CircuitMode,
    },
    /// A protected call failed or its result was classified as a failure.
    CircuitCallFailure {
        /// Protected call-site name.
        name: String,
        /// Mode in which the failure occurred.
        mode: CircuitMode,
        /// Consecutive failures at the time of the failure.
        consecutive_failures: u32,
        /// Rendered error.
        error: String,
    },
    /// A call was refused because the circuit is open.
    CircuitCallRejected {
        /// Protected call-site name.
        name: String,
    },
    /// A circuit was reset to closed.
    CircuitReset {
        /// Protected call-site name.
        name: String,
    },
}

impl OrchestratorEvent {
    /// Stable wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SchedulerStarted => "scheduler:started",
            Self::SchedulerStopped => "scheduler:stopped",
            Self::TaskScheduled { .. } => "task:scheduled",
            Self::TaskStarted { .. } => "task:started",
            Self::TaskCompleted { .. } => "task:completed",
            Self::TaskFailed { .. } => "task:failed",
            Self::TaskCancelled { .. } => "task:cancelled",
            Self::DeadlockDetected { .. } => "deadlock:detected",
            Self::ResourceRegistered { .. } => "resource:registered",
            Self::ResourceUnregistered { .. } => "resource:unregistered",
            Self::ResourceRebalanced { .. } => "resource:rebalanced",
            Self::AllocationCompleted { .. } => "allocation:completed",
            Self::AllocationRejected { .. } => "allocation:rejected",
            Self::AllocationQueued { .. } => "allocation:queued",
            Self::AllocationAdjusted { .. } => "allocation:adjusted",
            Self::DeallocationCompleted { .. } => "deallocation:completed",
            Self::CircuitStateChanged { .. } => "circuit:state:changed",
            Self::CircuitCallSuccess { .. } => "circuit:call:success",
            Self::CircuitCallFailure { .. } => "circuit:call:failure",
            Self::CircuitCallRejected { .. } => "circuit:call:rejected",
            Self::CircuitReset { .. } => "circuit:reset",
        }
    }
}

/// Synchronous event consumer.
pub trait EventSink: Send + Sync {
    /// Record an emitted event.
    fn record(&self, event: &OrchestratorEvent);
}

/// Fan-out point for [`OrchestratorEvent`]s.
///
/// Cloning is cheap and clones share subscribers and sinks.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrchestratorEvent>,
    sinks: Arc<RwLock<Vec<Arc<dyn EventSink>>>>,
}

impl EventBus {
    /// Create a bus whose broadcast channel buffers `capacity` events per
    /// lagging subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sinks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Subscribe to every event emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    /// Register a sink invoked on every emission.
    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Number of live broadcast subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Deliver one event to sinks and subscribers.
    pub fn emit(&self, event: OrchestratorEvent) {
        tracing::trace!(event = event.name(), "emitting event");
        for sink in self.sinks.read().iter() {
            sink.record(&event);
        }
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    /// Deliver events in order.
    pub fn emit_all(&self, events: impl IntoIterator<Item = OrchestratorEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}
