//! Named guards for the backend's external dependencies.
//!
//! The registry is a construction-time convenience: it builds one
//! [`CallGuard`](crate::CallGuard) per dependency and hands them out by name.
//! Construct it once at startup and pass it to whatever needs it.

mod dependency;
mod guard_registry;

pub use dependency::Dependency;
pub use guard_registry::{GuardRegistry, GuardRegistryBuilder, RegistrySettings};
