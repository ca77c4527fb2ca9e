//! Call guard implementation.

use crate::core::{ConfigResult, GuardError};
use crate::events::{emit_transition, GuardListener, TransitionEvent};
use crate::guard::config::GuardConfig;
use crate::guard::state::{CircuitState, GuardMetrics, GuardSnapshot, GuardState};

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A circuit breaker guarding calls to one external dependency.
///
/// The guard races every call against its call timeout, counts consecutive
/// failures, and stops attempting calls once the dependency looks unhealthy.
///
/// # States
///
/// - **Closed**: Normal operation. Calls pass through, failures are counted.
/// - **Open**: The dependency is failing. Calls are rejected immediately.
/// - **Half-Open**: After the reset window, exactly one trial call is let
///   through. Its outcome closes or reopens the guard. Other callers are
///   rejected while the trial is in flight.
///
/// # Example
///
/// ```rust
/// use callguard::{CallGuard, GuardConfig};
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GuardConfig::new(Duration::from_secs(5), 3, Duration::from_secs(30));
/// let guard = CallGuard::new("payment", config)?;
///
/// let charged = guard
///     .execute(|| async { Ok::<_, std::io::Error>("charge-123") })
///     .await?;
/// assert_eq!(charged, "charge-123");
/// # Ok(())
/// # }
/// ```
pub struct CallGuard {
    /// Name used in errors and log fields.
    name: String,
    /// Configuration.
    config: GuardConfig,
    /// State machine and counters, mutated together.
    inner: Mutex<GuardInner>,
    /// Transition listeners.
    listeners: Vec<Arc<dyn GuardListener>>,
}

#[derive(Debug, Default)]
struct GuardInner {
    state: CircuitState,
    metrics: GuardMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted while closed.
    Regular,
    /// The single half-open probe.
    Trial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Timeout,
}

/// Why a call was not admitted.
struct Rejected {
    retry_in: Option<Duration>,
}

/// An admitted call. Dropping it unsettled records the call as abandoned.
struct CallPermit<'a> {
    guard: &'a CallGuard,
    admission: Admission,
    settled: bool,
}

impl CallPermit<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.guard.settle(self.admission, outcome);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.guard.abandon(self.admission);
        }
    }
}

impl CallGuard {
    /// Creates a new guard after validating its configuration.
    pub fn new(name: impl Into<String>, config: GuardConfig) -> ConfigResult<Self> {
        let name = name.into();
        config.validate(&name)?;

        Ok(Self {
            name,
            config,
            inner: Mutex::new(GuardInner::default()),
            listeners: Vec::new(),
        })
    }

    /// Attaches a listener that receives every transition event.
    pub fn with_listener(mut self, listener: Arc<dyn GuardListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Returns the name of this guard.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Returns the current state.
    pub fn state(&self) -> GuardState {
        self.lock().state.kind()
    }

    /// Returns the current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().state.consecutive_failures()
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> GuardMetrics {
        self.lock().metrics.clone()
    }

    /// Returns a consistent view of state, counters and metrics.
    pub fn snapshot(&self) -> GuardSnapshot {
        let inner = self.lock();
        GuardSnapshot {
            name: self.name.clone(),
            state: inner.state.kind(),
            consecutive_failures: inner.state.consecutive_failures(),
            last_failure_age: inner.state.last_failure().map(|at| at.elapsed()),
            metrics: inner.metrics.clone(),
        }
    }

    /// Runs `operation` under the guard.
    ///
    /// If the guard is open and the reset window has not elapsed, this fails
    /// with [`GuardError::Open`] and `operation` is never called. Otherwise the
    /// operation's future is raced against the call timeout:
    ///
    /// * `Ok(value)` when the operation succeeds in time.
    /// * [`GuardError::Underlying`] with the operation's own error.
    /// * [`GuardError::Timeout`] when the timer fires first.
    ///
    /// On timeout the operation's future is dropped, which cancels it; it is
    /// not left running in the background. Use
    /// [`execute_detached`](Self::execute_detached) when the work must run to
    /// completion after the caller has been answered.
    ///
    /// Failures and timeouts both count towards opening the guard.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.admit::<E>()?;
        self.race(permit, operation()).await
    }

    /// Runs `operation` under the guard as a spawned task.
    ///
    /// Admission, outcomes and accounting are the same as for
    /// [`execute`](Self::execute), but when the timer fires first the task is
    /// detached instead of cancelled: the caller gets
    /// [`GuardError::Timeout`] while the operation keeps running, and its late
    /// result is discarded.
    ///
    /// A panic inside the operation is resumed on the caller.
    pub async fn execute_detached<F, Fut, T, E>(&self, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let permit = self.admit::<E>()?;
        let task = tokio::spawn(operation());
        let joined = async move {
            match task.await {
                Ok(result) => result,
                Err(err) => match err.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    // Cancelled only by runtime shutdown, which drops this task too.
                    Err(_) => std::future::pending().await,
                },
            }
        };
        self.race(permit, joined).await
    }

    fn admit<E>(&self) -> Result<CallPermit<'_>, GuardError<E>> {
        self.try_acquire()
            .map_err(|rejected| GuardError::open(self.name.as_str(), rejected.retry_in))
    }

    async fn race<Fut, T, E>(
        &self,
        permit: CallPermit<'_>,
        operation: Fut,
    ) -> Result<T, GuardError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.config.call_timeout, operation).await {
            Ok(Ok(value)) => {
                permit.settle(Outcome::Success);
                Ok(value)
            }
            Ok(Err(err)) => {
                permit.settle(Outcome::Failure);
                Err(GuardError::Underlying(err))
            }
            Err(_) => {
                permit.settle(Outcome::Timeout);
                Err(GuardError::timeout(self.name.as_str(), self.config.call_timeout))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decides whether a call may proceed. The open to half-open transition
    /// happens under the lock, so only one caller can become the trial.
    fn try_acquire(&self) -> Result<CallPermit<'_>, Rejected> {
        let now = Instant::now();
        let mut inner = self.lock();
        let current = inner.state;

        let admission = match current {
            CircuitState::Closed { .. } => Admission::Regular,

            CircuitState::Open {
                consecutive_failures,
                last_failure,
            } => {
                let elapsed = now.saturating_duration_since(last_failure);
                if elapsed > self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen {
                        consecutive_failures,
                        last_failure,
                    };
                    Admission::Trial
                } else {
                    inner.metrics.record_rejected();
                    return Err(Rejected {
                        retry_in: Some(self.config.reset_timeout.saturating_sub(elapsed)),
                    });
                }
            }

            CircuitState::HalfOpen { .. } => {
                inner.metrics.record_rejected();
                return Err(Rejected { retry_in: None });
            }
        };

        Ok(CallPermit {
            guard: self,
            admission,
            settled: false,
        })
    }

    /// Applies the outcome of an admitted call.
    fn settle(&self, admission: Admission, outcome: Outcome) {
        let now = Instant::now();

        let event = {
            let mut inner = self.lock();

            match outcome {
                Outcome::Success => inner.metrics.record_success(),
                Outcome::Failure => inner.metrics.record_failure(),
                Outcome::Timeout => inner.metrics.record_timeout(),
            }

            let succeeded = outcome == Outcome::Success;
            match (admission, inner.state) {
                (Admission::Trial, CircuitState::HalfOpen { .. }) if succeeded => {
                    inner.state = CircuitState::closed();
                    inner.metrics.record_closed();
                    Some(TransitionEvent::new(
                        self.name.as_str(),
                        GuardState::HalfOpen,
                        GuardState::Closed,
                        0,
                    ))
                }

                (
                    Admission::Trial,
                    CircuitState::HalfOpen {
                        consecutive_failures,
                        ..
                    },
                ) => {
                    let failures = consecutive_failures.saturating_add(1);
                    inner.state = CircuitState::Open {
                        consecutive_failures: failures,
                        last_failure: now,
                    };
                    inner.metrics.record_opened();
                    Some(TransitionEvent::new(
                        self.name.as_str(),
                        GuardState::HalfOpen,
                        GuardState::Open,
                        failures,
                    ))
                }

                (Admission::Regular, CircuitState::Closed { last_failure, .. }) if succeeded => {
                    inner.state = CircuitState::Closed {
                        consecutive_failures: 0,
                        last_failure,
                    };
                    None
                }

                (
                    Admission::Regular,
                    CircuitState::Closed {
                        consecutive_failures,
                        ..
                    },
                ) => {
                    let failures = consecutive_failures.saturating_add(1);
                    if failures >= self.config.failure_threshold {
                        inner.state = CircuitState::Open {
                            consecutive_failures: failures,
                            last_failure: now,
                        };
                        inner.metrics.record_opened();
                        Some(TransitionEvent::new(
                            self.name.as_str(),
                            GuardState::Closed,
                            GuardState::Open,
                            failures,
                        ))
                    } else {
                        inner.state = CircuitState::Closed {
                            consecutive_failures: failures,
                            last_failure: Some(now),
                        };
                        None
                    }
                }

                // Calls admitted while closed that settle after the guard
                // opened; only the trial decides a half-open outcome.
                _ => None,
            }
        };

        if let Some(event) = event {
            self.publish(&event);
        }
    }

    /// Handles a call whose future was dropped before it settled.
    fn abandon(&self, admission: Admission) {
        let reopened = {
            let mut inner = self.lock();
            inner.metrics.record_abandoned();

            match (admission, inner.state) {
                (
                    Admission::Trial,
                    CircuitState::HalfOpen {
                        consecutive_failures,
                        last_failure,
                    },
                ) => {
                    // Keep the old timestamp so the next caller can probe at once.
                    inner.state = CircuitState::Open {
                        consecutive_failures,
                        last_failure,
                    };
                    true
                }
                _ => false,
            }
        };

        if reopened {
            tracing::debug!(
                target: "callguard::events",
                guard = %self.name,
                "Trial call abandoned, circuit breaker {} back to OPEN",
                self.name
            );
        }
    }

    fn publish(&self, event: &TransitionEvent) {
        emit_transition(event);
        for listener in &self.listeners {
            listener.on_transition(event);
        }
    }
}

impl fmt::Debug for CallGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallGuard")
            .field("name", &self.name)
            .field("state", &self.lock().state)
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
