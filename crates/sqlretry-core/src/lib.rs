//! # sqlretry-core
//!
//! Core library for configurable database retry logic providing:
//! - Retry options with validated bounds
//! - Fixed, incremental and exponential interval enumerators
//! - Transient error classification by server error number
//! - Retry logic providers with sync and async execution
//! - YAML settings, environment overrides and a retry method registry

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::{RetryLogicManager, RetryMethodRegistry, RetrySettingsLoader};
pub use error::{Error, Result};
pub use retry::{ConfigurableRetryFactory, RetryError, RetryLogicProvider};

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
