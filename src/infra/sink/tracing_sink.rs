//! Sink forwarding every event to `tracing`.

use tracing::{info, warn};

use crate::core::{EventSink, OrchestratorEvent};

/// Logs events at `info`, failures and anomalies at `warn`, with the event
/// serialized as a JSON field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &OrchestratorEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        match event {
            OrchestratorEvent::TaskFailed { .. }
            | OrchestratorEvent::DeadlockDetected { .. }
            | OrchestratorEvent::AllocationRejected { .. }
            | OrchestratorEvent::CircuitCallRejected { .. } => {
                warn!(target: "orchestrator::events", event = event.name(), %payload);
            }
            _ => {
                info!(target: "orchestrator::events", event = event.name(), %payload);
            }
        }
    }
}
