//! # Prometheus Orchestrator
//!
//! Dependency-aware task scheduling, capacity-bounded resource allocation and
//! circuit breaking for AI agent workloads.
//!
//! ## Components
//!
//! - **Scheduler**: priority queue of tasks with prerequisite edges and
//!   resource requirements. Orders by critical-path length, priority and
//!   deadline; admits tasks whose prerequisites completed; bounds concurrency;
//!   cancels tasks caught in dependency cycles.
//! - **Resource allocator**: named resources with numeric capacity. Grants,
//!   overcommits within a ratio, or queues requests; retries the queue when
//!   capacity is released; fair-share rebalancing.
//! - **Circuit breakers**: closed/open/half-open automaton around fallible
//!   async calls, with a manager keyed by call-site name.
//!
//! Every component reports state changes on a shared [`core::EventBus`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use prometheus_orchestrator::builders::OrchestratorBuilder;
//! use prometheus_orchestrator::config::OrchestratorConfig;
//! use prometheus_orchestrator::core::{AllocationRequest, ResourceSpec, TaskSpec};
//! use prometheus_orchestrator::runtime::TokioSpawner;
//! use serde_json::json;
//!
//! prometheus_orchestrator::util::init_tracing();
//! let orchestrator = OrchestratorBuilder::new(OrchestratorConfig::from_env()?)
//!     .build(TokioSpawner::current())?;
//! orchestrator.start();
//!
//! let gpu = orchestrator.allocator().register(ResourceSpec::new("gpu-0", "gpu", 24));
//! orchestrator.allocator().allocate(AllocationRequest::new("agent-1", &gpu, 8))?;
//!
//! let fetch = orchestrator
//!     .scheduler()
//!     .submit(TaskSpec::from_fn("fetch", || async { Ok(json!({ "rows": 10 })) }));
//! orchestrator.scheduler().submit(
//!     TaskSpec::from_fn("index", || async { Ok(json!("done")) }).depends_on(fetch),
//! );
//!
//! let api = orchestrator.breakers().breaker("vendor-api");
//! let reply = api.execute(|| async { Ok(json!("pong")) }).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Scheduler, allocator, circuit breakers and their shared types.
pub mod core;
/// Configuration models for every component.
pub mod config;
/// Builders to construct an orchestrator from configuration.
pub mod builders;
/// Event sink backends.
pub mod infra;
/// Tokio spawner and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
