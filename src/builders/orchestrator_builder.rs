//! Builder wiring configuration and collaborators into an [`Orchestrator`].

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::core::{EventBus, EventSink, Orchestrator, OrchestratorError, Spawn};
use crate::util::clock::{Clock, SystemClock};
use crate::util::ids::{IdGenerator, UuidIdGenerator};

/// Assemble an [`Orchestrator`] with injectable id generation, time and sinks.
///
/// ```rust,ignore
/// let orchestrator = OrchestratorBuilder::new(OrchestratorConfig::from_env()?)
///     .with_event_sink(Arc::new(TracingEventSink))
///     .build(TokioSpawner::current())?;
/// ```
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl OrchestratorBuilder {
    /// Start from `config` with UUID ids, the system clock and no sinks.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            ids: Arc::new(UuidIdGenerator),
            clock: Arc::new(SystemClock),
            sinks: Vec::new(),
        }
    }

    /// Generate task and resource ids with `ids`.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Read time from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a sink on the shared bus.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Validate the configuration and build.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::InvalidConfig` if the configuration is invalid.
    pub fn build<S>(self, spawner: S) -> Result<Orchestrator<S>, OrchestratorError>
    where
        S: Spawn + Clone + Send + Sync + 'static,
    {
        let events = EventBus::new(self.config.event_buffer);
        for sink in self.sinks {
            events.add_sink(sink);
        }
        Orchestrator::from_parts(self.config, spawner, events, self.ids, self.clock)
    }
}
