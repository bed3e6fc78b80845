//! Capacity-bounded resource allocator.
//!
//! Resources carry a numeric capacity and a per-consumer allocation map.
//! `allocate` never blocks: a request is granted, granted as an overcommit, or
//! parked in a priority-ordered pending list that is retried whenever capacity
//! is returned through `deallocate`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AllocationStrategy, AllocatorConfig};
use crate::core::events::{EventBus, OrchestratorEvent};
use crate::core::OrchestratorError;
use crate::util::ids::{IdGenerator, UuidIdGenerator};

/// Resource identifier.
pub type ResourceId = String;
/// Consumer identifier.
pub type ConsumerId = String;

/// Registration request for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Caller-chosen id; generated when `None`. Reusing an id overwrites.
    #[serde(default)]
    pub id: Option<ResourceId>,
    /// Display name.
    pub name: String,
    /// Type tag such as `gpu` or `api-quota`.
    pub kind: String,
    /// Total capacity in units.
    pub capacity: u64,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ResourceSpec {
    /// Describe a resource of `capacity` units.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, capacity: u64) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind: kind.into(),
            capacity,
            metadata: BTreeMap::new(),
        }
    }

    /// Use a caller-chosen id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A registered resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Type tag.
    pub kind: String,
    /// Total capacity in units.
    pub capacity: u64,
    /// Units not currently granted. Negative while overcommitted.
    pub available: i64,
    /// Units held per consumer.
    pub allocations: BTreeMap<ConsumerId, u64>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Resource {
    /// Units currently granted across all consumers.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.allocations.values().sum()
    }

    /// `(capacity - available) / capacity * 100`; zero for zero-capacity resources.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        let used = i128::from(self.capacity) - i128::from(self.available);
        used as f64 / self.capacity as f64 * 100.0
    }
}

/// A consumer's request for units of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Requesting consumer.
    pub consumer_id: ConsumerId,
    /// Target resource.
    pub resource_id: ResourceId,
    /// Units requested.
    pub amount: u64,
    /// Higher is retried first while pending.
    #[serde(default)]
    pub priority: i32,
    /// Expected hold time. Informational.
    #[serde(default)]
    pub duration_ms: u64,
}

impl AllocationRequest {
    /// Request `amount` units of `resource_id` for `consumer_id`.
    pub fn new(
        consumer_id: impl Into<ConsumerId>,
        resource_id: impl Into<ResourceId>,
        amount: u64,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            resource_id: resource_id.into(),
            amount,
            priority: 0,
            duration_ms: 0,
        }
    }

    /// Set the request priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the expected hold time.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Immediate result of [`ResourceAllocator::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// Granted from available capacity.
    Granted,
    /// Granted beyond nominal capacity, within the overcommit ratio.
    Overcommitted,
    /// Parked until capacity is released.
    Queued,
}

impl AllocationOutcome {
    /// Whether the consumer holds the units now.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted | Self::Overcommitted)
    }
}

/// One consumer's change during a rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Consumer identifier.
    pub consumer_id: ConsumerId,
    /// Units held before.
    pub from: u64,
    /// Units held after.
    pub to: u64,
}

/// Outcome of a rebalance pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceReport {
    /// Resource identifier.
    pub resource_id: ResourceId,
    /// Strategy applied.
    pub strategy: AllocationStrategy,
    /// Per-consumer share consumers were clamped to.
    pub fair_share: u64,
    /// Units returned to `available`.
    pub reclaimed: u64,
    /// Consumers whose allocation changed.
    pub adjustments: Vec<Adjustment>,
}

/// Direction of a capacity recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityAction {
    /// Add capacity.
    Increase,
    /// Remove capacity.
    Decrease,
}

impl fmt::Display for CapacityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => f.write_str("increase"),
            Self::Decrease => f.write_str("decrease"),
        }
    }
}

/// Suggested capacity change derived from utilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecommendation {
    /// Resource identifier.
    pub resource_id: ResourceId,
    /// Suggested direction.
    pub action: CapacityAction,
    /// Utilization in percent that triggered it.
    pub utilization: f64,
    /// Suggested delta in units.
    pub amount: u64,
    /// Human-readable reason.
    pub reason: String,
}

/// Aggregate allocator counters, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocatorStats {
    /// Registered resources.
    pub total_resources: usize,
    /// Sum of capacities.
    pub total_capacity: u64,
    /// Sum of granted units.
    pub total_allocated: u64,
    /// Sum of available units (may be negative under overcommit).
    pub total_available: i64,
    /// `total_allocated / total_capacity * 100`.
    pub utilization_rate: f64,
    /// Requests waiting for capacity.
    pub pending_requests: usize,
    /// Lifetime grants.
    pub total_allocations: u64,
    /// Lifetime releases.
    pub total_deallocations: u64,
    /// Lifetime refusals.
    pub total_rejections: u64,
}

#[derive(Default)]
struct AllocatorState {
    resources: BTreeMap<ResourceId, Resource>,
    pending: Vec<AllocationRequest>,
    total_allocations: u64,
    total_deallocations: u64,
    total_rejections: u64,
}

enum Admission {
    Granted,
    Overcommitted,
    Denied,
}

impl AllocatorState {
    /// Try to grant `request`; on success the units are booked and the event
    /// is pushed onto `events`.
    fn try_grant(
        &mut self,
        request: &AllocationRequest,
        overcommit_ratio: f64,
        events: &mut Vec<OrchestratorEvent>,
    ) -> Option<AllocationOutcome> {
        let resource = self.resources.get_mut(&request.resource_id)?;
        let overcommitted = match admission(resource, request.amount, overcommit_ratio) {
            Admission::Granted => false,
            Admission::Overcommitted => true,
            Admission::Denied => return None,
        };

        let available_before = resource.available;
        resource.available = resource
            .available
            .saturating_sub(i64::try_from(request.amount).unwrap_or(i64::MAX));
        *resource
            .allocations
            .entry(request.consumer_id.clone())
            .or_insert(0) += request.amount;
        let available_after = resource.available;
        self.total_allocations += 1;

        if overcommitted {
            warn!(
                resource_id = %request.resource_id,
                consumer_id = %request.consumer_id,
                amount = request.amount,
                available_after,
                "allocation overcommits resource"
            );
        } else {
            debug!(
                resource_id = %request.resource_id,
                consumer_id = %request.consumer_id,
                amount = request.amount,
                available_after,
                "allocation granted"
            );
        }

        events.push(OrchestratorEvent::AllocationCompleted {
            request: request.clone(),
            available_before,
            available_after,
            overcommitted,
        });
        Some(if overcommitted {
            AllocationOutcome::Overcommitted
        } else {
            AllocationOutcome::Granted
        })
    }

    /// Retry pending requests for one resource, first fit in priority order.
    fn retry_pending(
        &mut self,
        resource_id: &str,
        overcommit_ratio: f64,
        events: &mut Vec<OrchestratorEvent>,
    ) {
        let pending = std::mem::take(&mut self.pending);
        let mut still_pending = Vec::with_capacity(pending.len());
        for request in pending {
            if request.resource_id == resource_id
                && self.try_grant(&request, overcommit_ratio, events).is_some()
            {
                continue;
            }
            still_pending.push(request);
        }
        self.pending = still_pending;
    }
}

#[allow(clippy::cast_precision_loss)]
fn admission(resource: &Resource, amount: u64, overcommit_ratio: f64) -> Admission {
    let amount_signed = i128::from(amount);
    if i128::from(resource.available) >= amount_signed {
        return Admission::Granted;
    }
    let allocated_after =
        i128::from(resource.capacity) - i128::from(resource.available) + amount_signed;
    if allocated_after as f64 <= resource.capacity as f64 * overcommit_ratio {
        Admission::Overcommitted
    } else {
        Admission::Denied
    }
}

/// Registry of capacity-bounded resources.
///
/// All methods are synchronous. Internal state sits behind one
/// `parking_lot::Mutex`; notifications are emitted after it is released.
pub struct ResourceAllocator {
    config: AllocatorConfig,
    state: Mutex<AllocatorState>,
    events: EventBus,
    ids: Arc<dyn IdGenerator>,
}

impl fmt::Debug for ResourceAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ResourceAllocator")
            .field("config", &self.config)
            .field("resources", &state.resources.len())
            .field("pending", &state.pending.len())
            .finish_non_exhaustive()
    }
}

impl ResourceAllocator {
    /// Create an allocator with its own event bus and UUID ids.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: AllocatorConfig) -> Result<Self, OrchestratorError> {
        Self::with_components(config, EventBus::default(), Arc::new(UuidIdGenerator))
    }

    /// Create an allocator from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the configuration is invalid.
    pub fn with_components(
        config: AllocatorConfig,
        events: EventBus,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, OrchestratorError> {
        config.validate().map_err(OrchestratorError::InvalidConfig)?;
        Ok(Self {
            config,
            state: Mutex::new(AllocatorState::default()),
            events,
            ids,
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Event bus this allocator emits on.
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a resource with `available = capacity` and no allocations.
    /// A reused id silently replaces the previous resource.
    pub fn register(&self, spec: ResourceSpec) -> ResourceId {
        let id = spec
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.ids.next_id());
        let resource = Resource {
            id: id.clone(),
            name: spec.name,
            kind: spec.kind,
            capacity: spec.capacity,
            available: i64::try_from(spec.capacity).unwrap_or(i64::MAX),
            allocations: BTreeMap::new(),
            metadata: spec.metadata,
        };
        let event = OrchestratorEvent::ResourceRegistered {
            resource_id: id.clone(),
            name: resource.name.clone(),
            kind: resource.kind.clone(),
            capacity: resource.capacity,
        };

        if self
            .state
            .lock()
            .resources
            .insert(id.clone(), resource)
            .is_some()
        {
            debug!(resource_id = %id, "resource id reused, previous resource replaced");
        }
        info!(resource_id = %id, capacity = spec.capacity, "registered resource");
        self.events.emit(event);
        id
    }

    /// Remove a resource. Pending requests for it are dropped. Returns
    /// `false` if it was not registered.
    pub fn unregister(&self, resource_id: &str) -> bool {
        let (resource, dropped) = {
            let mut state = self.state.lock();
            let Some(resource) = state.resources.remove(resource_id) else {
                return false;
            };
            let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|r| r.resource_id == resource_id);
            state.pending = kept;
            state.total_rejections += dropped.len() as u64;
            (resource, dropped)
        };

        let active_allocations = resource.allocations.len();
        if active_allocations > 0 {
            warn!(
                resource_id,
                active_allocations, "unregistering resource with active allocations"
            );
        } else {
            info!(resource_id, "unregistered resource");
        }

        self.events
            .emit_all(dropped.into_iter().map(|request| OrchestratorEvent::AllocationRejected {
                request,
                reason: "resource_unregistered".to_string(),
            }));
        self.events.emit(OrchestratorEvent::ResourceUnregistered {
            resource_id: resource_id.to_string(),
            active_allocations,
        });
        true
    }

    /// Decide a request immediately: grant, overcommit-grant, or queue.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for a zero-unit request, `ResourceNotFound` for an
    /// unknown resource. Both count as rejections.
    pub fn allocate(
        &self,
        request: AllocationRequest,
    ) -> Result<AllocationOutcome, OrchestratorError> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.state.lock();
            if request.amount == 0 {
                state.total_rejections += 1;
                events.push(OrchestratorEvent::AllocationRejected {
                    request: request.clone(),
                    reason: "invalid_amount".to_string(),
                });
                Err(OrchestratorError::InvalidAmount {
                    resource_id: request.resource_id,
                    amount: 0,
                })
            } else if !state.resources.contains_key(&request.resource_id) {
                state.total_rejections += 1;
                events.push(OrchestratorEvent::AllocationRejected {
                    request: request.clone(),
                    reason: "resource_not_found".to_string(),
                });
                Err(OrchestratorError::ResourceNotFound(request.resource_id))
            } else if let Some(outcome) =
                state.try_grant(&request, self.config.overcommit_ratio, &mut events)
            {
                Ok(outcome)
            } else {
                debug!(
                    resource_id = %request.resource_id,
                    consumer_id = %request.consumer_id,
                    amount = request.amount,
                    "insufficient capacity, queueing request"
                );
                state.pending.push(request.clone());
                // Stable: equal priorities keep arrival order.
                state.pending.sort_by(|a, b| b.priority.cmp(&a.priority));
                events.push(OrchestratorEvent::AllocationQueued {
                    request,
                    pending: state.pending.len(),
                });
                Ok(AllocationOutcome::Queued)
            }
        };

        if let Err(error) = &result {
            warn!(error = %error, "allocation rejected");
        }
        self.events.emit_all(events);
        result
    }

    /// Release everything `consumer_id` holds on `resource_id`, then retry
    /// pending requests for that resource. Returns `false` and changes
    /// nothing if either is unknown.
    pub fn deallocate(&self, consumer_id: &str, resource_id: &str) -> bool {
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(resource) = state.resources.get_mut(resource_id) else {
                return false;
            };
            let Some(amount) = resource.allocations.remove(consumer_id) else {
                return false;
            };
            let available_before = resource.available;
            resource.available = resource
                .available
                .saturating_add(i64::try_from(amount).unwrap_or(i64::MAX));
            let available_after = resource.available;
            state.total_deallocations += 1;

            debug!(resource_id, consumer_id, amount, available_after, "deallocated");
            events.push(OrchestratorEvent::DeallocationCompleted {
                consumer_id: consumer_id.to_string(),
                resource_id: resource_id.to_string(),
                amount,
                available_before,
                available_after,
            });

            state.retry_pending(resource_id, self.config.overcommit_ratio, &mut events);
        }
        self.events.emit_all(events);
        true
    }

    /// Redistribute a resource under the configured strategy.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for an unknown resource.
    pub fn rebalance(&self, resource_id: &str) -> Result<RebalanceReport, OrchestratorError> {
        let report = {
            let mut state = self.state.lock();
            let resource = state
                .resources
                .get_mut(resource_id)
                .ok_or_else(|| OrchestratorError::ResourceNotFound(resource_id.to_string()))?;

            let consumers = resource.allocations.len() as u64;
            let fair_share = if consumers == 0 {
                resource.capacity
            } else {
                resource.capacity / consumers
            };

            let mut adjustments = Vec::new();
            match self.config.strategy {
                AllocationStrategy::Fair => {
                    for (consumer_id, held) in &mut resource.allocations {
                        if *held > fair_share {
                            adjustments.push(Adjustment {
                                consumer_id: consumer_id.clone(),
                                from: *held,
                                to: fair_share,
                            });
                            *held = fair_share;
                        }
                    }
                }
                AllocationStrategy::Priority => {
                    debug!(resource_id, "priority rebalancing makes no adjustments");
                }
            }

            let reclaimed: u64 = adjustments.iter().map(|a| a.from - a.to).sum();
            resource.available = resource
                .available
                .saturating_add(i64::try_from(reclaimed).unwrap_or(i64::MAX));

            RebalanceReport {
                resource_id: resource_id.to_string(),
                strategy: self.config.strategy,
                fair_share,
                reclaimed,
                adjustments,
            }
        };

        info!(
            resource_id,
            strategy = %report.strategy,
            fair_share = report.fair_share,
            reclaimed = report.reclaimed,
            "rebalanced resource"
        );
        self.events
            .emit_all(report.adjustments.iter().map(|a| OrchestratorEvent::AllocationAdjusted {
                consumer_id: a.consumer_id.clone(),
                resource_id: resource_id.to_string(),
                from: a.from,
                to: a.to,
            }));
        self.events.emit(OrchestratorEvent::ResourceRebalanced {
            resource_id: resource_id.to_string(),
            fair_share: report.fair_share,
            reclaimed: report.reclaimed,
        });
        Ok(report)
    }

    /// Utilization of one resource in percent.
    pub fn utilization(&self, resource_id: &str) -> Option<f64> {
        self.state
            .lock()
            .resources
            .get(resource_id)
            .map(Resource::utilization)
    }

    /// Recommendations for resources above 90% or below 20% utilization,
    /// ordered by resource id.
    pub fn capacity_recommendations(&self) -> Vec<CapacityRecommendation> {
        let state = self.state.lock();
        state
            .resources
            .values()
            .filter_map(|resource| {
                let utilization = resource.utilization();
                if utilization > 90.0 {
                    Some(CapacityRecommendation {
                        resource_id: resource.id.clone(),
                        action: CapacityAction::Increase,
                        utilization,
                        amount: resource.capacity.div_ceil(2),
                        reason: format!("high utilization ({utilization:.1}%)"),
                    })
                } else if utilization < 20.0 {
                    Some(CapacityRecommendation {
                        resource_id: resource.id.clone(),
                        action: CapacityAction::Decrease,
                        utilization,
                        amount: resource.capacity.saturating_mul(3).div_ceil(10),
                        reason: format!("low utilization ({utilization:.1}%)"),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Snapshot of one resource.
    pub fn resource(&self, resource_id: &str) -> Option<Resource> {
        self.state.lock().resources.get(resource_id).cloned()
    }

    /// Snapshots of every resource with the given type tag.
    pub fn resources_by_kind(&self, kind: &str) -> Vec<Resource> {
        self.state
            .lock()
            .resources
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Requests waiting for capacity, in retry order.
    pub fn pending_requests(&self) -> Vec<AllocationRequest> {
        self.state.lock().pending.clone()
    }

    /// Aggregate counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> AllocatorStats {
        let state = self.state.lock();
        let mut stats = AllocatorStats {
            total_resources: state.resources.len(),
            pending_requests: state.pending.len(),
            total_allocations: state.total_allocations,
            total_deallocations: state.total_deallocations,
            total_rejections: state.total_rejections,
            ..AllocatorStats::default()
        };
        for resource in state.resources.values() {
            stats.total_capacity = stats.total_capacity.saturating_add(resource.capacity);
            stats.total_allocated = stats.total_allocated.saturating_add(resource.allocated());
            stats.total_available = stats.total_available.saturating_add(resource.available);
        }
        if stats.total_capacity > 0 {
            stats.utilization_rate =
                stats.total_allocated as f64 / stats.total_capacity as f64 * 100.0;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ids::SequentialIdGenerator;

    fn allocator(ratio: f64) -> ResourceAllocator {
        ResourceAllocator::with_components(
            AllocatorConfig {
                overcommit_ratio: ratio,
                ..AllocatorConfig::default()
            },
            EventBus::default(),
            Arc::new(SequentialIdGenerator::new("res")),
        )
        .unwrap()
    }

    #[test]
    fn test_admission_tiers() {
        let resource = Resource {
            id: "r".into(),
            name: "r".into(),
            kind: "k".into(),
            capacity: 10,
            available: 4,
            allocations: BTreeMap::new(),
            metadata: BTreeMap::new(),
        };
        assert!(matches!(admission(&resource, 4, 1.0), Admission::Granted));
        assert!(matches!(admission(&resource, 5, 1.0), Admission::Denied));
        assert!(matches!(admission(&resource, 5, 1.5), Admission::Overcommitted));
        assert!(matches!(admission(&resource, 10, 1.5), Admission::Denied));
    }

    #[test]
    fn test_register_generates_id() {
        let alloc = allocator(1.0);
        let id = alloc.register(ResourceSpec::new("gpu", "gpu", 8));
        assert_eq!(id, "res-1");
        let resource = alloc.resource(&id).unwrap();
        assert_eq!(resource.available, 8);
        assert!(resource.allocations.is_empty());
    }

    #[test]
    fn test_repeat_allocation_accumulates() {
        let alloc = allocator(1.0);
        let id = alloc.register(ResourceSpec::new("pool", "slots", 10));
        alloc.allocate(AllocationRequest::new("c", &id, 3)).unwrap();
        alloc.allocate(AllocationRequest::new("c", &id, 2)).unwrap();
        let resource = alloc.resource(&id).unwrap();
        assert_eq!(resource.allocations["c"], 5);
        assert_eq!(resource.available, 5);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let alloc = allocator(1.0);
        let id = alloc.register(ResourceSpec::new("pool", "slots", 10));
        let err = alloc.allocate(AllocationRequest::new("c", &id, 0)).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidAmount { .. }));
        assert_eq!(alloc.stats().total_rejections, 1);
    }

    #[test]
    fn test_recommendation_amounts() {
        let alloc = allocator(1.0);
        let hot = alloc.register(ResourceSpec::new("hot", "k", 10).with_id("a-hot"));
        alloc.register(ResourceSpec::new("cold", "k", 10).with_id("b-cold"));
        alloc.allocate(AllocationRequest::new("c", &hot, 10)).unwrap();

        let recs = alloc.capacity_recommendations();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].action, CapacityAction::Increase);
        assert_eq!(recs[0].amount, 5);
        assert_eq!(recs[1].action, CapacityAction::Decrease);
        assert_eq!(recs[1].amount, 3);
    }
}
