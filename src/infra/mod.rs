//! Infrastructure adapters for event sinks.

pub mod sink;

pub use sink::{InMemoryEventSink, TracingEventSink};
