//! Registry of named circuit breakers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CircuitBreakerConfig;
use crate::core::circuit_breaker::{BreakerHooks, BreakerStats, CircuitBreaker, CircuitMode};
use crate::core::events::EventBus;
use crate::core::OrchestratorError;
use crate::util::clock::{Clock, SystemClock};

/// Health classification derived from a breaker's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Closed.
    Healthy,
    /// Half-open.
    Degraded,
    /// Open.
    Unhealthy,
}

impl From<CircuitMode> for HealthStatus {
    fn from(mode: CircuitMode) -> Self {
        match mode {
            CircuitMode::Closed => Self::Healthy,
            CircuitMode::HalfOpen => Self::Degraded,
            CircuitMode::Open => Self::Unhealthy,
        }
    }
}

/// Breaker names grouped by health, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Closed circuits.
    pub healthy: Vec<String>,
    /// Half-open circuits.
    pub degraded: Vec<String>,
    /// Open circuits.
    pub unhealthy: Vec<String>,
}

impl HealthReport {
    /// No circuit is open or half-open.
    #[must_use]
    pub fn all_healthy(&self) -> bool {
        self.degraded.is_empty() && self.unhealthy.is_empty()
    }
}

/// Lazily populated map from call-site name to breaker. All breakers emit on
/// the manager's bus with their name attached.
pub struct CircuitBreakerManager {
    defaults: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CircuitBreakerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerManager")
            .field("defaults", &self.defaults)
            .field("breakers", &self.breakers.read().len())
            .finish_non_exhaustive()
    }
}

impl CircuitBreakerManager {
    /// Create a manager whose breakers use `defaults`.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the defaults are invalid.
    pub fn new(defaults: CircuitBreakerConfig) -> Result<Self, OrchestratorError> {
        Self::with_components(defaults, EventBus::default(), Arc::new(SystemClock))
    }

    /// Create a manager from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the defaults are invalid.
    pub fn with_components(
        defaults: CircuitBreakerConfig,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OrchestratorError> {
        defaults
            .validate()
            .map_err(OrchestratorError::InvalidConfig)?;
        Ok(Self {
            defaults,
            breakers: RwLock::new(HashMap::new()),
            events,
            clock,
        })
    }

    /// Event bus shared by every managed breaker.
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Breaker for `name`, created with the default thresholds on first use.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(name) {
            return Arc::clone(existing);
        }
        let mut breakers = self.breakers.write();
        Arc::clone(breakers.entry(name.to_string()).or_insert_with(|| {
            debug!(circuit = name, "creating circuit breaker");
            Arc::new(self.build(name, self.defaults.clone(), BreakerHooks::default()))
        }))
    }

    /// Breaker for `name`, created with `config` and `hooks` if it does not
    /// exist yet. An existing breaker is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if a new breaker would be
    /// created from an invalid configuration.
    pub fn breaker_with(
        &self,
        name: &str,
        config: CircuitBreakerConfig,
        hooks: BreakerHooks,
    ) -> Result<Arc<CircuitBreaker>, OrchestratorError> {
        let mut breakers = self.breakers.write();
        if let Some(existing) = breakers.get(name) {
            return Ok(Arc::clone(existing));
        }
        config.validate().map_err(OrchestratorError::InvalidConfig)?;
        debug!(circuit = name, "creating circuit breaker with custom config");
        let breaker = Arc::new(self.build(name, config, hooks));
        breakers.insert(name.to_string(), Arc::clone(&breaker));
        Ok(breaker)
    }

    fn build(&self, name: &str, config: CircuitBreakerConfig, hooks: BreakerHooks) -> CircuitBreaker {
        // Already validated by the caller.
        CircuitBreaker::from_validated(name, config)
            .with_hooks(hooks)
            .with_clock(Arc::clone(&self.clock))
            .with_events(self.events.clone())
    }

    /// Existing breaker, without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(name).cloned()
    }

    /// Forget a breaker. Handles already given out keep working.
    pub fn remove(&self, name: &str) -> bool {
        self.breakers.write().remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Health of every breaker.
    pub fn health(&self) -> HealthReport {
        let mut report = HealthReport::default();
        for (name, breaker) in self.breakers.read().iter() {
            let bucket = match HealthStatus::from(breaker.mode()) {
                HealthStatus::Healthy => &mut report.healthy,
                HealthStatus::Degraded => &mut report.degraded,
                HealthStatus::Unhealthy => &mut report.unhealthy,
            };
            bucket.push(name.clone());
        }
        report.healthy.sort();
        report.degraded.sort();
        report.unhealthy.sort();
        report
    }

    /// Statistics for every breaker keyed by name.
    pub fn stats(&self) -> BTreeMap<String, BreakerStats> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.stats()))
            .collect()
    }

    /// Reset every breaker to closed.
    pub fn reset_all(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> = self.breakers.read().values().cloned().collect();
        info!(count = breakers.len(), "resetting all circuit breakers");
        for breaker in breakers {
            breaker.reset();
        }
    }
}
