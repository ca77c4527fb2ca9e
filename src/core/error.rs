//! Error types for the callguard library.
//!
//! A guarded call fails in exactly one of three ways, and callers branch on the
//! variant rather than on message text. Configuration problems have their own
//! type so they never mix with call outcomes.

use std::time::Duration;
use thiserror::Error;

/// The error returned by [`CallGuard::execute`](crate::CallGuard::execute).
///
/// `E` is the error type of the wrapped operation.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The guard refused to attempt the call.
    ///
    /// The wrapped operation was never invoked. Waiting and retrying later is
    /// always safe.
    #[error("Circuit breaker {name} is OPEN")]
    Open {
        /// Name of the guard that rejected the call.
        name: String,
        /// Time left until a trial call will be admitted, if known.
        retry_in: Option<Duration>,
    },

    /// The wrapped operation did not finish within the call timeout.
    #[error("Circuit breaker timeout: {name} exceeded {timeout:?}")]
    Timeout {
        /// Name of the guard whose call timed out.
        name: String,
        /// The configured call timeout.
        timeout: Duration,
    },

    /// The wrapped operation failed with its own error.
    #[error(transparent)]
    Underlying(E),
}

impl<E> GuardError<E> {
    /// Creates an `Open` error.
    pub fn open(name: impl Into<String>, retry_in: Option<Duration>) -> Self {
        Self::Open {
            name: name.into(),
            retry_in,
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(name: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            name: name.into(),
            timeout,
        }
    }

    /// Returns `true` if the call was short-circuited.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if the call exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the wrapped operation itself failed.
    pub fn is_underlying(&self) -> bool {
        matches!(self, Self::Underlying(_))
    }

    /// Returns the guard name for guard-produced errors.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Open { name, .. } | Self::Timeout { name, .. } => Some(name),
            Self::Underlying(_) => None,
        }
    }

    /// Returns the recovery hint of an `Open` error.
    pub fn retry_in(&self) -> Option<Duration> {
        match self {
            Self::Open { retry_in, .. } => *retry_in,
            _ => None,
        }
    }

    /// Returns the wrapped operation's error, if that is what failed.
    pub fn into_underlying(self) -> Option<E> {
        match self {
            Self::Underlying(err) => Some(err),
            _ => None,
        }
    }

    /// Maps the underlying error type, leaving guard errors untouched.
    pub fn map_underlying<F, E2>(self, f: F) -> GuardError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Open { name, retry_in } => GuardError::Open { name, retry_in },
            Self::Timeout { name, timeout } => GuardError::Timeout { name, timeout },
            Self::Underlying(err) => GuardError::Underlying(f(err)),
        }
    }
}

/// Error type for guard and registry configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A guard was given an empty name.
    #[error("guard name must not be empty")]
    EmptyName,

    /// The failure threshold must be at least one.
    #[error("guard '{name}': failure threshold must be at least 1")]
    InvalidThreshold {
        /// Name of the misconfigured guard.
        name: String,
    },

    /// A duration that must be positive was zero.
    #[error("guard '{name}': {field} must be greater than zero")]
    ZeroDuration {
        /// Name of the misconfigured guard.
        name: String,
        /// The offending field.
        field: &'static str,
    },

    /// Two guards were registered under the same name.
    #[error("guard '{name}' is registered more than once")]
    DuplicateGuard {
        /// The duplicated name.
        name: String,
    },

    /// Settings could not be parsed.
    #[error("invalid guard settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A specialized `Result` type for guarded calls.
pub type GuardResult<T, E> = Result<T, GuardError<E>>;

/// A specialized `Result` type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
