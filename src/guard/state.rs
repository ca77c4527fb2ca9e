//! Call guard state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// The externally visible state of a call guard.
///
/// This is a snapshot for monitoring and tests. It must not drive control
/// logic; by the time the caller looks at it the guard may have moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardState {
    /// Calls are attempted normally.
    Closed,
    /// Calls are rejected without being attempted.
    Open,
    /// A single trial call is probing the dependency.
    HalfOpen,
}

impl GuardState {
    /// Returns `true` if the guard is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the guard is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the guard is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen)
    }

    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal state, carrying the data each phase needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CircuitState {
    /// Calls pass through; failures are counted.
    Closed {
        /// Consecutive failures since the last success.
        consecutive_failures: u32,
        /// When the most recent failure happened.
        last_failure: Option<Instant>,
    },

    /// Calls are rejected until the reset window has elapsed.
    Open {
        /// Failure count, frozen until the reset window has elapsed.
        consecutive_failures: u32,
        /// When the failure that opened the guard happened.
        last_failure: Instant,
    },

    /// The trial call is in flight.
    HalfOpen {
        /// Failure count carried over from the open phase; a failed trial adds one.
        consecutive_failures: u32,
        /// Failure timestamp carried over from the open phase.
        last_failure: Instant,
    },
}

impl CircuitState {
    pub(crate) fn closed() -> Self {
        Self::Closed {
            consecutive_failures: 0,
            last_failure: None,
        }
    }

    pub(crate) fn kind(&self) -> GuardState {
        match self {
            Self::Closed { .. } => GuardState::Closed,
            Self::Open { .. } => GuardState::Open,
            Self::HalfOpen { .. } => GuardState::HalfOpen,
        }
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        match self {
            Self::Closed {
                consecutive_failures,
                ..
            }
            | Self::Open {
                consecutive_failures,
                ..
            }
            | Self::HalfOpen {
                consecutive_failures,
                ..
            } => *consecutive_failures,
        }
    }

    pub(crate) fn last_failure(&self) -> Option<Instant> {
        match self {
            Self::Closed { last_failure, .. } => *last_failure,
            Self::Open { last_failure, .. } | Self::HalfOpen { last_failure, .. } => {
                Some(*last_failure)
            }
        }
    }
}

impl Default for CircuitState {
    fn default() -> Self {
        Self::closed()
    }
}

/// Counters describing how a guard has been used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardMetrics {
    /// Number of calls submitted, rejected ones included.
    pub total_calls: u64,
    /// Calls whose operation succeeded.
    pub successful_calls: u64,
    /// Calls whose operation returned an error.
    pub failed_calls: u64,
    /// Calls that exceeded the call timeout.
    pub timed_out_calls: u64,
    /// Calls rejected without being attempted.
    pub rejected_calls: u64,
    /// Calls dropped by the caller before they settled.
    pub abandoned_calls: u64,
    /// Number of transitions into the open state.
    pub times_opened: u64,
    /// Number of recoveries from half-open to closed.
    pub times_closed: u64,
}

impl GuardMetrics {
    /// Creates empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&mut self) {
        self.total_calls += 1;
        self.successful_calls += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.total_calls += 1;
        self.failed_calls += 1;
    }

    pub(crate) fn record_timeout(&mut self) {
        self.total_calls += 1;
        self.timed_out_calls += 1;
    }

    pub(crate) fn record_rejected(&mut self) {
        self.total_calls += 1;
        self.rejected_calls += 1;
    }

    pub(crate) fn record_abandoned(&mut self) {
        self.total_calls += 1;
        self.abandoned_calls += 1;
    }

    pub(crate) fn record_opened(&mut self) {
        self.times_opened += 1;
    }

    pub(crate) fn record_closed(&mut self) {
        self.times_closed += 1;
    }

    /// Calls that reached the dependency and came back with an outcome.
    pub fn attempted_calls(&self) -> u64 {
        self.successful_calls + self.failed_calls + self.timed_out_calls
    }

    /// Returns the success rate of attempted calls (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        let attempted = self.attempted_calls();
        if attempted == 0 {
            return 1.0;
        }
        self.successful_calls as f64 / attempted as f64
    }

    /// Returns the failure rate of attempted calls, timeouts included (0.0 to 1.0).
    pub fn failure_rate(&self) -> f64 {
        let attempted = self.attempted_calls();
        if attempted == 0 {
            return 0.0;
        }
        (self.failed_calls + self.timed_out_calls) as f64 / attempted as f64
    }
}

/// A point-in-time view of a guard, for health endpoints and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardSnapshot {
    /// Guard name.
    pub name: String,
    /// Current state.
    pub state: GuardState,
    /// Consecutive failures; frozen while open, bumped by a failed trial.
    pub consecutive_failures: u32,
    /// Time since the most recent failure, if any.
    pub last_failure_age: Option<Duration>,
    /// Usage counters.
    pub metrics: GuardMetrics,
}
