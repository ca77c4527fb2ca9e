//! # Callguard
//!
//! Circuit breakers for calls to unreliable external dependencies such as
//! payment, push-notification and email gateways.
//!
//! ## Overview
//!
//! A [`CallGuard`] wraps any asynchronous operation and:
//!
//! - Enforces a per-call timeout
//! - Counts consecutive failures, timeouts included
//! - Opens after a threshold and rejects calls immediately while open
//! - Lets a single trial call through after the reset window to detect recovery
//!
//! The guard never retries and never substitutes fallback values; those
//! policies belong to the caller.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use callguard::{Dependency, GuardError, GuardRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build once at startup and pass it to the services that need it
//!     let registry = Arc::new(GuardRegistry::standard()?);
//!     let email = registry.dependency(Dependency::Email).unwrap();
//!
//!     match email.execute(|| send_welcome_mail()).await {
//!         Ok(()) => println!("sent"),
//!         Err(GuardError::Open { name, .. }) => println!("{name} is down, try later"),
//!         Err(GuardError::Timeout { .. }) => println!("gateway too slow"),
//!         Err(GuardError::Underlying(e)) => println!("gateway error: {e}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: Error types
//! - **Guard**: The state machine, its configuration and metrics
//! - **Events**: Structured transition events and listeners
//! - **Registry**: One pre-built guard per external dependency
//! - **Mock**: Test doubles for guarded dependencies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod events;
pub mod guard;
pub mod mock;
pub mod registry;

// Re-export commonly used types at the crate root
pub use crate::core::{ConfigError, ConfigResult, GuardError, GuardResult};
pub use crate::events::{GuardListener, TransitionEvent};
pub use crate::guard::{CallGuard, GuardConfig, GuardMetrics, GuardSnapshot, GuardState};
pub use crate::registry::{Dependency, GuardRegistry, RegistrySettings};

/// Prelude module for convenient imports.
///
/// ```rust
/// use callguard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{ConfigError, GuardError, GuardResult};
    pub use crate::events::{GuardListener, TransitionEvent};
    pub use crate::guard::{CallGuard, GuardConfig, GuardSnapshot, GuardState};
    pub use crate::registry::{Dependency, GuardRegistry};
}
