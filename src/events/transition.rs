//! State transition events and their emission.

use crate::guard::GuardState;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Receives every state transition of the guards it is attached to.
///
/// Listeners run synchronously on the task that caused the transition and
/// must not block.
pub trait GuardListener: Send + Sync {
    /// Called once per transition, after the guard's lock is released.
    fn on_transition(&self, event: &TransitionEvent);
}

/// A transition into the open state, or a recovery back to closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Event type, `guard_opened` or `guard_recovered`.
    pub event_type: String,

    /// When the transition happened.
    pub timestamp: DateTime<Utc>,

    /// Name of the guard.
    pub guard: String,

    /// State before the transition.
    pub from: GuardState,

    /// State after the transition.
    pub to: GuardState,

    /// Consecutive failures at the moment of the transition.
    pub consecutive_failures: u32,
}

impl TransitionEvent {
    /// Creates an event stamped with the current time.
    ///
    /// Guards publish only transitions into open and back to closed; entering
    /// half-open is internal and produces no event.
    pub fn new(
        guard: impl Into<String>,
        from: GuardState,
        to: GuardState,
        consecutive_failures: u32,
    ) -> Self {
        let event_type = if to.is_open() {
            "guard_opened"
        } else {
            "guard_recovered"
        };
        Self {
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            guard: guard.into(),
            from,
            to,
            consecutive_failures,
        }
    }

    /// Returns `true` if this event opened the guard.
    pub fn is_opened(&self) -> bool {
        self.to.is_open()
    }

    /// Returns `true` if this event closed a half-open guard.
    pub fn is_recovery(&self) -> bool {
        self.from.is_half_open() && self.to.is_closed()
    }
}

/// Emits a transition event through `tracing`.
pub fn emit_transition(event: &TransitionEvent) {
    if event.to.is_open() {
        tracing::warn!(
            target: "callguard::events",
            event_type = %event.event_type,
            guard = %event.guard,
            from = %event.from,
            consecutive_failures = event.consecutive_failures,
            "Circuit breaker {} opened",
            event.guard
        );
    } else {
        tracing::info!(
            target: "callguard::events",
            event_type = %event.event_type,
            guard = %event.guard,
            from = %event.from,
            "Circuit breaker {} recovered",
            event.guard
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let opened = TransitionEvent::new("payment", GuardState::Closed, GuardState::Open, 5);
        assert_eq!(opened.event_type, "guard_opened");
        assert!(opened.is_opened());
        assert!(!opened.is_recovery());

        let recovered =
            TransitionEvent::new("payment", GuardState::HalfOpen, GuardState::Closed, 0);
        assert_eq!(recovered.event_type, "guard_recovered");
        assert!(recovered.is_recovery());
    }

    #[test]
    fn test_event_serializes_states() {
        let event = TransitionEvent::new("push", GuardState::HalfOpen, GuardState::Open, 3);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["guard"], "push");
        assert_eq!(json["from"], "HALF_OPEN");
        assert_eq!(json["to"], "OPEN");
        assert_eq!(json["consecutive_failures"], 3);
    }
}
