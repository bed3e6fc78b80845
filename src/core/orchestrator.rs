//! Facade owning one scheduler, allocator and breaker manager on a shared bus.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::OrchestratorConfig;
use crate::core::allocator::ResourceAllocator;
use crate::core::breaker_manager::CircuitBreakerManager;
use crate::core::events::{EventBus, OrchestratorEvent};
use crate::core::executor::Spawn;
use crate::core::scheduler::Scheduler;
use crate::core::OrchestratorError;
use crate::util::clock::{Clock, SystemClock};
use crate::util::ids::{IdGenerator, UuidIdGenerator};

/// The three orchestration components wired to one [`EventBus`].
///
/// The scheduler's resource gate and the allocator's capacity model are
/// independent. Callers using both keep them consistent.
pub struct Orchestrator<S> {
    config: OrchestratorConfig,
    scheduler: Scheduler<S>,
    allocator: Arc<ResourceAllocator>,
    breakers: Arc<CircuitBreakerManager>,
    events: EventBus,
}

impl<S> Orchestrator<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Wire components from `config` with UUID ids and the system clock.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if any section is invalid.
    pub fn new(config: OrchestratorConfig, spawner: S) -> Result<Self, OrchestratorError> {
        let events = EventBus::new(config.event_buffer);
        Self::from_parts(
            config,
            spawner,
            events,
            Arc::new(UuidIdGenerator),
            Arc::new(SystemClock),
        )
    }

    pub(crate) fn from_parts(
        config: OrchestratorConfig,
        spawner: S,
        events: EventBus,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OrchestratorError> {
        config.validate().map_err(OrchestratorError::InvalidConfig)?;
        let scheduler = Scheduler::with_components(
            config.scheduler.clone(),
            spawner,
            events.clone(),
            Arc::clone(&ids),
            Arc::clone(&clock),
        )?;
        let allocator =
            ResourceAllocator::with_components(config.allocator.clone(), events.clone(), ids)?;
        let breakers = CircuitBreakerManager::with_components(
            config.circuit_breaker.clone(),
            events.clone(),
            clock,
        )?;
        Ok(Self {
            config,
            scheduler,
            allocator: Arc::new(allocator),
            breakers: Arc::new(breakers),
            events,
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Task scheduler.
    pub const fn scheduler(&self) -> &Scheduler<S> {
        &self.scheduler
    }

    /// Resource allocator.
    pub const fn allocator(&self) -> &Arc<ResourceAllocator> {
        &self.allocator
    }

    /// Circuit breaker registry.
    pub const fn breakers(&self) -> &Arc<CircuitBreakerManager> {
        &self.breakers
    }

    /// Shared notification bus.
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to every component's notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Start the scheduler.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop the scheduler. Running tasks finish normally.
    pub fn stop(&self) {
        self.scheduler.stop();
    }
}
