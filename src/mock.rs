//! Test doubles for guarded dependencies.
//!
//! [`MockDependency`] stands in for an external gateway and can be switched
//! between healthy and failing at runtime. [`RecordingListener`] captures the
//! transition events a guard emits.

use crate::events::{GuardListener, TransitionEvent};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Error returned by a failing [`MockDependency`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency '{name}' failed: {reason}")]
pub struct MockError {
    /// Name of the mock dependency.
    pub name: String,
    /// Failure description.
    pub reason: String,
}

/// A mock external dependency.
///
/// # Examples
///
/// ```rust
/// use callguard::mock::MockDependency;
/// use std::time::Duration;
///
/// let gateway = MockDependency::new()
///     .with_name("stripe")
///     .with_latency(Duration::from_millis(20));
/// gateway.set_failing(true);
/// assert_eq!(gateway.call_count(), 0);
/// ```
#[derive(Debug)]
pub struct MockDependency {
    name: String,
    latency: Option<Duration>,
    failing: AtomicBool,
    call_count: AtomicU64,
}

impl MockDependency {
    /// Creates a healthy mock with no latency.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            latency: None,
            failing: AtomicBool::new(false),
            call_count: AtomicU64::new(0),
        }
    }

    /// Creates a mock that fails every call.
    pub fn new_failing() -> Self {
        let mock = Self::new();
        mock.set_failing(true);
        mock
    }

    /// Sets the name of this dependency.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the simulated latency of each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Switches the dependency between failing and healthy.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the number of times the dependency was invoked.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns the name of this dependency.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Performs one call.
    pub async fn call(&self) -> Result<String, MockError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(MockError {
                name: self.name.clone(),
                reason: "simulated failure".to_string(),
            });
        }

        Ok(format!("{}: ok", self.name))
    }
}

impl Default for MockDependency {
    fn default() -> Self {
        Self::new()
    }
}

/// A listener that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingListener {
    /// Creates an empty listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns `true` if no event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GuardListener for RecordingListener {
    fn on_transition(&self, event: &TransitionEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
