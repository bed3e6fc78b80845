//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use crate::core::{OrchestratorError, Spawn};

/// Tokio-based spawner that executes tasks on a tokio runtime.
///
/// Built from an existing handle, or owning a multi-thread runtime that lives
/// as long as any clone of the spawner.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
    runtime_owner: Option<Arc<OwnedRuntime>>,
}

/// Runtime owned by a spawner. Shut down without blocking so the last clone
/// may be dropped from inside one of its own tasks.
struct OwnedRuntime(Option<tokio::runtime::Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.runtime_owner.is_some())
            .finish()
    }
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            runtime_owner: None,
        }
    }

    /// Spawner for the runtime this is called from.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; see [`Self::try_current`].
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Spawner for the current runtime, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Runtime` outside a tokio runtime.
    pub fn try_current() -> Result<Self, OrchestratorError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| OrchestratorError::Runtime(e.to_string()))
    }

    /// Create a spawner owning a new multi-threaded runtime with
    /// `worker_threads` workers.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Runtime` if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, OrchestratorError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("orchestrator-worker")
            .enable_all()
            .build()
            .map_err(|e| OrchestratorError::Runtime(e.to_string()))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime_owner: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Owned multi-threaded runtime with one worker per logical CPU.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Runtime` if the runtime cannot be built.
    pub fn multi_thread() -> Result<Self, OrchestratorError> {
        Self::with_worker_threads(num_cpus::get())
    }

    /// Handle tasks are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
