//! Component and root orchestrator configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::events::DEFAULT_EVENT_BUFFER;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "ORCHESTRATOR_";

/// Task scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum tasks running at once.
    pub max_concurrent: usize,
    /// Reorder the queue by critical-path length after priority and deadline.
    pub enable_critical_path: bool,
    /// Periodically cancel pending tasks that sit on a dependency cycle.
    pub enable_deadlock_detection: bool,
    /// Interval between deadlock scans.
    pub deadlock_check_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            enable_critical_path: true,
            enable_deadlock_detection: true,
            deadlock_check_interval_ms: 5_000,
        }
    }
}

impl SchedulerConfig {
    /// Validate scheduler settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.enable_deadlock_detection && self.deadlock_check_interval_ms == 0 {
            return Err("deadlock_check_interval_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// How `rebalance` redistributes a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Clamp every consumer to `floor(capacity / consumers)`.
    #[default]
    Fair,
    /// Priority-weighted redistribution. Accepted but performs no adjustments.
    Priority,
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fair => f.write_str("fair"),
            Self::Priority => f.write_str("priority"),
        }
    }
}

impl FromStr for AllocationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fair" => Ok(Self::Fair),
            "priority" => Ok(Self::Priority),
            other => Err(format!("unknown allocation strategy `{other}`")),
        }
    }
}

/// Resource allocator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Multiplier on nominal capacity that grants may reach before requests queue.
    pub overcommit_ratio: f64,
    /// Rebalancing strategy.
    pub strategy: AllocationStrategy,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            overcommit_ratio: 1.0,
            strategy: AllocationStrategy::Fair,
        }
    }
}

impl AllocatorConfig {
    /// Validate allocator settings.
    pub fn validate(&self) -> Result<(), String> {
        if !self.overcommit_ratio.is_finite() || self.overcommit_ratio < 1.0 {
            return Err(format!(
                "overcommit_ratio must be a finite value >= 1.0, got {}",
                self.overcommit_ratio
            ));
        }
        Ok(())
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in closed mode that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,
    /// Time an open circuit waits before admitting a probe.
    pub timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_ms: 60_000,
        }
    }
}

impl CircuitBreakerConfig {
    /// Validate breaker thresholds.
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".into());
        }
        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".into());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Allocator settings.
    pub allocator: AllocatorConfig,
    /// Defaults for circuits created without explicit thresholds.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Broadcast buffer for event subscribers.
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            allocator: AllocatorConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl OrchestratorConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))?;
        self.allocator
            .validate()
            .map_err(|e| format!("allocator invalid: {e}"))?;
        self.circuit_breaker
            .validate()
            .map_err(|e| format!("circuit_breaker invalid: {e}"))?;
        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a `.env` file if present, then apply `ORCHESTRATOR_*` overrides
    /// from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("failed to load .env file: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Keys are
    /// `ORCHESTRATOR_MAX_CONCURRENT`, `ORCHESTRATOR_ENABLE_CRITICAL_PATH`,
    /// `ORCHESTRATOR_ENABLE_DEADLOCK_DETECTION`,
    /// `ORCHESTRATOR_DEADLOCK_CHECK_INTERVAL_MS`,
    /// `ORCHESTRATOR_OVERCOMMIT_RATIO`, `ORCHESTRATOR_ALLOCATION_STRATEGY`,
    /// `ORCHESTRATOR_BREAKER_FAILURE_THRESHOLD`,
    /// `ORCHESTRATOR_BREAKER_SUCCESS_THRESHOLD`,
    /// `ORCHESTRATOR_BREAKER_TIMEOUT_MS` and `ORCHESTRATOR_EVENT_BUFFER`.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, String>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        override_from(&lookup, "MAX_CONCURRENT", &mut cfg.scheduler.max_concurrent)?;
        override_from(&lookup, "ENABLE_CRITICAL_PATH", &mut cfg.scheduler.enable_critical_path)?;
        override_from(
            &lookup,
            "ENABLE_DEADLOCK_DETECTION",
            &mut cfg.scheduler.enable_deadlock_detection,
        )?;
        override_from(
            &lookup,
            "DEADLOCK_CHECK_INTERVAL_MS",
            &mut cfg.scheduler.deadlock_check_interval_ms,
        )?;
        override_from(&lookup, "OVERCOMMIT_RATIO", &mut cfg.allocator.overcommit_ratio)?;
        override_from(&lookup, "ALLOCATION_STRATEGY", &mut cfg.allocator.strategy)?;
        override_from(
            &lookup,
            "BREAKER_FAILURE_THRESHOLD",
            &mut cfg.circuit_breaker.failure_threshold,
        )?;
        override_from(
            &lookup,
            "BREAKER_SUCCESS_THRESHOLD",
            &mut cfg.circuit_breaker.success_threshold,
        )?;
        override_from(&lookup, "BREAKER_TIMEOUT_MS", &mut cfg.circuit_breaker.timeout_ms)?;
        override_from(&lookup, "EVENT_BUFFER", &mut cfg.event_buffer)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn override_from<L, T>(lookup: &L, suffix: &str, target: &mut T) -> Result<(), String>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    if let Some(raw) = lookup(&key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))?;
    }
    Ok(())
}
