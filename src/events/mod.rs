//! Structured transition events.
//!
//! Guards emit an event through `tracing` when they open and when they
//! recover, and hand the same event to any attached [`GuardListener`].
//! Events can be captured by any tracing subscriber (JSON, OpenTelemetry, etc.).

mod transition;

pub use transition::{emit_transition, GuardListener, TransitionEvent};
