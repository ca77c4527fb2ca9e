//! Core types shared by the rest of the library.
//!
//! - [`error`] - Typed errors for guarded calls and configuration

pub mod error;

pub use error::{ConfigError, ConfigResult, GuardError, GuardResult};
