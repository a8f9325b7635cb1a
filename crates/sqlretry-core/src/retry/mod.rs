//! Retry execution engine for database operations
//!
//! This module decides whether a failed database operation (opening a
//! connection, executing a command) is run again, how many times, and how
//! long to wait in between.
//!
//! # Features
//!
//! - Fixed, incremental and exponential backoff bounded by min/max intervals
//! - Transient classification by server error number, with an intrinsic list
//! - Optional authorized condition over the command text
//! - A `retrying` notification whose handlers can cancel the sequence
//! - Observable loop events via the `RetryObserver` trait
//! - Sync and async execution; async waits honor a `CancellationToken`
//!
//! # Example
//!
//! ```rust,no_run
//! use sqlretry_core::retry::{ConfigurableRetryFactory, RetryError};
//! use sqlretry_core::types::RetryOptions;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> Result<u64, RetryError<std::io::Error>> {
//!     let options = RetryOptions::builder().number_of_tries(5).build().unwrap();
//!     let provider = ConfigurableRetryFactory::create_exponential_retry_provider(&options).unwrap();
//!
//!     provider
//!         .execute_async(Some("SELECT COUNT(*) FROM orders"), &CancellationToken::new(), || async {
//!             // Run the command here
//!             Ok(42)
//!         })
//!         .await
//! }
//! ```

mod error;
mod factory;
mod intervals;
mod logic;
mod observer;
mod predicates;
mod provider;

pub use error::{AggregateRetryError, RetryError, Termination};
pub use factory::ConfigurableRetryFactory;
pub use intervals::{
    validate_time_intervals, IntervalEnumerator, IntervalStrategy, EXPONENTIAL_JITTER,
    MAX_TIME_INTERVAL,
};
pub use logic::{RetryDecision, RetryLogic, RetryLogicSnapshot, RetryState, TransientPredicate};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use predicates::{
    AlwaysRetry, ClosurePredicate, CodedError, NeverRetry, RetryPredicate, TransientErrorCodes,
    INTRINSIC_TRANSIENT_ERRORS,
};
pub use provider::{RetryLogicProvider, RetryingEventArgs, RetryingHandler, RetryingHandlerId};

#[cfg(test)]
mod tests;
