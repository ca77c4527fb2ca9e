//! Circuit breakers for calls to external dependencies.
//!
//! A [`CallGuard`] stops traffic to a failing dependency and periodically
//! lets a single trial call through to detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through.
//! - **Open**: The dependency is failing; calls are rejected immediately.
//! - **Half-Open**: One trial call is probing the dependency.
//!
//! ## Usage
//!
//! ```rust
//! use callguard::guard::{CallGuard, GuardConfig};
//! use std::time::Duration;
//!
//! let config = GuardConfig::default()
//!     .with_call_timeout(Duration::from_secs(5))
//!     .with_failure_threshold(3)
//!     .with_reset_timeout(Duration::from_secs(60));
//!
//! let guard = CallGuard::new("push", config).unwrap();
//! assert!(guard.state().is_closed());
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::CallGuard;
pub use config::{GuardConfig, GuardSettings};
pub use state::{GuardMetrics, GuardSnapshot, GuardState};
