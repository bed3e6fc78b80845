//! Three-state circuit breaker wrapping fallible async calls.
//!
//! ```text
//! closed --(failures >= failure_threshold)--> open
//! open --(next call after timeout)--> half_open
//! half_open --(successes >= success_threshold)--> closed
//! half_open --(any failure)--> open
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;
use crate::core::events::{EventBus, OrchestratorEvent};
use crate::core::{AppResult, OrchestratorError};
use crate::util::clock::{Clock, SystemClock};

/// Breaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitMode {
    /// Calls pass through.
    #[default]
    Closed,
    /// Calls are rejected without invoking the protected call.
    Open,
    /// Probe calls pass through to test recovery.
    HalfOpen,
}

impl fmt::Display for CircuitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Open => f.write_str("open"),
            Self::HalfOpen => f.write_str("half_open"),
        }
    }
}

/// Snapshot of a breaker's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitState {
    /// Current mode.
    pub mode: CircuitMode,
    /// Failures since the last success or transition.
    pub consecutive_failures: u32,
    /// Successes while half-open.
    pub consecutive_successes: u32,
    /// Time of the most recent failure.
    pub last_failure_ms: Option<u128>,
    /// Earliest time an open circuit admits a probe.
    pub next_attempt_ms: Option<u128>,
    /// Lifetime calls, including rejected ones.
    pub total_calls: u64,
    /// Lifetime failures.
    pub total_failures: u64,
    /// Lifetime successes.
    pub total_successes: u64,
}

/// Read-only breaker statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerStats {
    /// Breaker name.
    pub name: String,
    /// Counter snapshot.
    pub state: CircuitState,
    /// `total_successes / total_calls * 100`.
    pub success_rate: f64,
    /// `total_failures / total_calls * 100`.
    pub failure_rate: f64,
}

/// Result substituted for a rejected call.
pub type Fallback = Arc<dyn Fn() -> BoxFuture<'static, AppResult<serde_json::Value>> + Send + Sync>;

/// Classifies a successful return value as a logical failure.
pub type FailurePredicate = Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>;

/// Optional behaviour attached to a breaker.
#[derive(Clone, Default)]
pub struct BreakerHooks {
    /// Invoked instead of failing when the circuit is open.
    pub fallback: Option<Fallback>,
    /// Marks error-shaped results as failures.
    pub is_failure: Option<FailurePredicate>,
}

impl BreakerHooks {
    /// Route rejected calls to `fallback`.
    #[must_use]
    pub fn with_fallback<F, Fut>(mut self, fallback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<serde_json::Value>> + Send + 'static,
    {
        self.fallback = Some(Arc::new(
            move || -> BoxFuture<'static, AppResult<serde_json::Value>> { Box::pin(fallback()) },
        ));
        self
    }

    /// Treat results matching `predicate` as failures.
    #[must_use]
    pub fn with_failure_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&serde_json::Value) -> bool + Send + Sync + 'static,
    {
        self.is_failure = Some(Arc::new(predicate));
        self
    }
}

impl fmt::Debug for BreakerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerHooks")
            .field("fallback", &self.fallback.is_some())
            .field("is_failure", &self.is_failure.is_some())
            .finish()
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum CircuitBreakerError {
    /// The circuit is open and no fallback is configured.
    #[error("circuit `{name}` is open")]
    Open {
        /// Breaker name.
        name: String,
    },
    /// The protected call failed.
    #[error("call failed: {0:#}")]
    Call(anyhow::Error),
    /// The call returned a value classified as a failure.
    #[error("circuit `{name}` rejected result: {result}")]
    RejectedResult {
        /// Breaker name.
        name: String,
        /// Offending value.
        result: serde_json::Value,
    },
    /// The circuit is open and the fallback failed too.
    #[error("fallback for circuit `{name}` failed: {error:#}")]
    Fallback {
        /// Breaker name.
        name: String,
        /// Fallback error.
        error: anyhow::Error,
    },
}

impl CircuitBreakerError {
    /// Whether the call was refused because the circuit is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Fallback { .. })
    }
}

/// Circuit breaker for one named call site.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    hooks: BreakerHooks,
    state: Mutex<CircuitState>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a closed breaker with the system clock and its own event bus.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Result<Self, OrchestratorError> {
        config.validate().map_err(OrchestratorError::InvalidConfig)?;
        Ok(Self::from_validated(name, config))
    }

    pub(crate) fn from_validated(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            hooks: BreakerHooks::default(),
            state: Mutex::new(CircuitState::default()),
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
        }
    }

    /// Attach a fallback and/or failure predicate.
    #[must_use]
    pub fn with_hooks(mut self, hooks: BreakerHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Emit on a shared bus.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Thresholds in use.
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `call` through the breaker.
    ///
    /// # Errors
    ///
    /// `Open` when the circuit rejects the call and no fallback is set,
    /// `Fallback` when the fallback fails, `Call` when the call itself fails
    /// and `RejectedResult` when the failure predicate matches.
    pub async fn execute<F, Fut>(&self, call: F) -> Result<serde_json::Value, CircuitBreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<serde_json::Value>>,
    {
        let mut events = Vec::new();
        let admitted = {
            let mut state = self.state.lock();
            state.total_calls += 1;
            if state.mode == CircuitMode::Open {
                let now = self.clock.now_ms();
                if state.next_attempt_ms.is_some_and(|at| now < at) {
                    false
                } else {
                    self.transition(&mut state, CircuitMode::HalfOpen, &mut events);
                    true
                }
            } else {
                true
            }
        };

        if !admitted {
            warn!(circuit = %self.name, "circuit open, rejecting call");
            events.push(OrchestratorEvent::CircuitCallRejected {
                name: self.name.clone(),
            });
            self.events.emit_all(events);
            return self.reject().await;
        }
        self.events.emit_all(events);

        match call().await {
            Ok(value) => {
                if self.hooks.is_failure.as_ref().is_some_and(|p| p(&value)) {
                    self.on_failure(&format!("result classified as failure: {value}"));
                    Err(CircuitBreakerError::RejectedResult {
                        name: self.name.clone(),
                        result: value,
                    })
                } else {
                    self.on_success();
                    Ok(value)
                }
            }
            Err(error) => {
                self.on_failure(&format!("{error:#}"));
                Err(CircuitBreakerError::Call(error))
            }
        }
    }

    async fn reject(&self) -> Result<serde_json::Value, CircuitBreakerError> {
        match &self.hooks.fallback {
            Some(fallback) => {
                debug!(circuit = %self.name, "serving fallback");
                fallback().await.map_err(|error| CircuitBreakerError::Fallback {
                    name: self.name.clone(),
                    error,
                })
            }
            None => Err(CircuitBreakerError::Open {
                name: self.name.clone(),
            }),
        }
    }

    fn on_success(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            state.total_successes += 1;
            let mode = state.mode;
            match mode {
                CircuitMode::HalfOpen => {
                    state.consecutive_successes += 1;
                    if state.consecutive_successes >= self.config.success_threshold {
                        self.transition(&mut state, CircuitMode::Closed, &mut events);
                    }
                }
                CircuitMode::Closed => state.consecutive_failures = 0,
                CircuitMode::Open => {}
            }
            events.insert(
                0,
                OrchestratorEvent::CircuitCallSuccess {
                    name: self.name.clone(),
                    mode: state.mode,
                },
            );
        }
        self.events.emit_all(events);
    }

    fn on_failure(&self, error: &str) {
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            state.total_failures += 1;
            state.consecutive_failures += 1;
            state.last_failure_ms = Some(self.clock.now_ms());
            events.push(OrchestratorEvent::CircuitCallFailure {
                name: self.name.clone(),
                mode: state.mode,
                consecutive_failures: state.consecutive_failures,
                error: error.to_string(),
            });
            let mode = state.mode;
            match mode {
                CircuitMode::HalfOpen => {
                    self.transition(&mut state, CircuitMode::Open, &mut events);
                }
                CircuitMode::Closed
                    if state.consecutive_failures >= self.config.failure_threshold =>
                {
                    self.transition(&mut state, CircuitMode::Open, &mut events);
                }
                _ => {}
            }
        }
        debug!(circuit = %self.name, error, "protected call failed");
        self.events.emit_all(events);
    }

    fn transition(
        &self,
        state: &mut CircuitState,
        to: CircuitMode,
        events: &mut Vec<OrchestratorEvent>,
    ) {
        let from = state.mode;
        state.mode = to;
        match to {
            CircuitMode::Open => {
                state.next_attempt_ms =
                    Some(self.clock.now_ms() + u128::from(self.config.timeout_ms));
                state.consecutive_successes = 0;
            }
            CircuitMode::HalfOpen => {
                state.consecutive_successes = 0;
                state.consecutive_failures = 0;
            }
            CircuitMode::Closed => {
                state.consecutive_failures = 0;
                state.consecutive_successes = 0;
                state.next_attempt_ms = None;
            }
        }
        if from == to {
            return;
        }
        info!(circuit = %self.name, %from, %to, "circuit state changed");
        events.push(OrchestratorEvent::CircuitStateChanged {
            name: self.name.clone(),
            from,
            to,
        });
    }

    fn force(&self, to: CircuitMode) {
        let mut events = Vec::new();
        self.transition(&mut self.state.lock(), to, &mut events);
        self.events.emit_all(events);
    }

    /// Force the circuit open for one timeout period.
    pub fn open(&self) {
        self.force(CircuitMode::Open);
    }

    /// Force the circuit closed.
    pub fn close(&self) {
        self.force(CircuitMode::Closed);
    }

    /// Force the circuit half-open.
    pub fn half_open(&self) {
        self.force(CircuitMode::HalfOpen);
    }

    /// Return to closed with cleared consecutive counters. Lifetime counters
    /// are kept.
    pub fn reset(&self) {
        {
            let mut state = self.state.lock();
            state.mode = CircuitMode::Closed;
            state.consecutive_failures = 0;
            state.consecutive_successes = 0;
            state.last_failure_ms = None;
            state.next_attempt_ms = None;
        }
        info!(circuit = %self.name, "circuit reset");
        self.events.emit(OrchestratorEvent::CircuitReset {
            name: self.name.clone(),
        });
    }

    /// Counter snapshot.
    pub fn state(&self) -> CircuitState {
        self.state.lock().clone()
    }

    /// Current mode.
    pub fn mode(&self) -> CircuitMode {
        self.state.lock().mode
    }

    /// Counters plus success and failure rates.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> BreakerStats {
        let state = self.state();
        let rate = |n: u64| {
            if state.total_calls == 0 {
                0.0
            } else {
                n as f64 / state.total_calls as f64 * 100.0
            }
        };
        BreakerStats {
            name: self.name.clone(),
            success_rate: rate(state.total_successes),
            failure_rate: rate(state.total_failures),
            state,
        }
    }

    /// Closed.
    pub fn is_healthy(&self) -> bool {
        self.mode() == CircuitMode::Closed
    }

    /// Open.
    pub fn is_open(&self) -> bool {
        self.mode() == CircuitMode::Open
    }

    /// Half-open.
    pub fn is_half_open(&self) -> bool {
        self.mode() == CircuitMode::HalfOpen
    }
}
