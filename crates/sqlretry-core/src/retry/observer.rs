//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring the provider's
//! execution loop and a `TracingObserver` implementation that logs using the
//! `tracing` crate.

use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::error::Termination;

/// Observer trait for retry loop events
///
/// Implement this trait to receive callbacks while a provider executes an
/// operation. This is useful for logging, metrics collection, or debugging.
///
/// # Example
///
/// ```rust
/// use sqlretry_core::retry::RetryObserver;
/// use std::error::Error;
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, attempt: u32, number_of_tries: u32) {}
///
///     fn on_retry_scheduled(&self, attempt: u32, error: &dyn Error, delay: Duration) {}
///
///     fn on_success(&self, attempt: u32, total_duration: Duration) {}
///
///     fn on_exhausted(&self, attempts: u32, final_error: &dyn Error) {}
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed)
    /// * `number_of_tries` - The configured total attempts
    fn on_attempt_start(&self, attempt: u32, number_of_tries: u32);

    /// Called when an attempt failed and another one is scheduled
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that failed (1-indexed)
    /// * `error` - The error that caused the failure
    /// * `delay` - The wait before the next attempt
    fn on_retry_scheduled(&self, attempt: u32, error: &dyn Error, delay: Duration);

    /// Called when the operation succeeds
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that succeeded (1-indexed)
    /// * `total_duration` - Total time spent across all attempts
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when every allowed attempt failed
    ///
    /// # Arguments
    ///
    /// * `attempts` - Total number of attempts made
    /// * `final_error` - The error from the final attempt
    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error);

    /// Called when the sequence stops for any reason other than exhaustion
    ///
    /// Covers non-transient errors, unauthorized commands, and cancellation
    /// by a `retrying` handler.
    fn on_stopped(&self, attempt: u32, reason: Termination, error: Option<&dyn Error>) {
        let _ = (attempt, reason, error);
    }

    /// Called when the external cancellation token fires
    fn on_cancelled(&self, attempts: u32) {
        let _ = attempts;
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _number_of_tries: u32) {}

    fn on_retry_scheduled(&self, _attempt: u32, _error: &dyn Error, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Error) {}
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_retry_scheduled`: WARN
/// - `on_success`: INFO (if > 1 attempt) or DEBUG (first attempt)
/// - `on_exhausted`: ERROR
/// - `on_stopped`: WARN (DEBUG for a first-attempt fast fail)
/// - `on_cancelled`: WARN
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the protected operation (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, number_of_tries: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt,
            number_of_tries,
            "starting attempt"
        );
    }

    fn on_retry_scheduled(&self, attempt: u32, error: &dyn Error, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error) {
        tracing::error!(
            operation = %self.operation,
            attempts,
            error = %final_error,
            "all retry attempts exhausted"
        );
    }

    fn on_stopped(&self, attempt: u32, reason: Termination, error: Option<&dyn Error>) {
        let error = error.map(|e| e.to_string()).unwrap_or_default();
        if attempt == 1 && reason != Termination::CancelledByHandler {
            tracing::debug!(
                operation = %self.operation,
                reason = %reason,
                error = %error,
                "failure is not retried"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                attempt,
                reason = %reason,
                error = %error,
                "retry stopped"
            );
        }
    }

    fn on_cancelled(&self, attempts: u32) {
        tracing::warn!(operation = %self.operation, attempts, "retry cancelled");
    }
}

/// An observer that collects statistics about retry events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    /// Attempt start events
    pub attempt_starts: AtomicU32,
    /// Scheduled retry events
    pub retries: AtomicU32,
    /// Success events
    pub successes: AtomicU32,
    /// Exhaustion events
    pub exhaustions: AtomicU32,
    /// Stop events (non-transient, unauthorized, handler cancel)
    pub stops: AtomicU32,
    /// External cancellation events
    pub cancellations: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of attempt starts
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Get the number of scheduled retries
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Get the number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Get the number of exhaustions
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    /// Get the number of stops
    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    /// Get the number of external cancellations
    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _number_of_tries: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry_scheduled(&self, _attempt: u32, _error: &dyn Error, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Error) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stopped(&self, _attempt: u32, _reason: Termination, _error: Option<&dyn Error>) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _attempts: u32) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, number_of_tries: u32) {
        (**self).on_attempt_start(attempt, number_of_tries)
    }

    fn on_retry_scheduled(&self, attempt: u32, error: &dyn Error, delay: Duration) {
        (**self).on_retry_scheduled(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error) {
        (**self).on_exhausted(attempts, final_error)
    }

    fn on_stopped(&self, attempt: u32, reason: Termination, error: Option<&dyn Error>) {
        (**self).on_stopped(attempt, reason, error)
    }

    fn on_cancelled(&self, attempts: u32) {
        (**self).on_cancelled(attempts)
    }
}

/// Implement RetryObserver for Box<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32, number_of_tries: u32) {
        (**self).on_attempt_start(attempt, number_of_tries)
    }

    fn on_retry_scheduled(&self, attempt: u32, error: &dyn Error, delay: Duration) {
        (**self).on_retry_scheduled(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error) {
        (**self).on_exhausted(attempts, final_error)
    }

    fn on_stopped(&self, attempt: u32, reason: Termination, error: Option<&dyn Error>) {
        (**self).on_stopped(attempt, reason, error)
    }

    fn on_cancelled(&self, attempts: u32) {
        (**self).on_cancelled(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    #[test]
    fn test_noop_observer() {
        let observer = NoOpObserver;
        let error = io::Error::other("test");

        observer.on_attempt_start(1, 3);
        observer.on_retry_scheduled(1, &error, Duration::from_millis(100));
        observer.on_success(2, Duration::from_millis(500));
        observer.on_exhausted(3, &error);
        observer.on_stopped(2, Termination::NonTransient, Some(&error));
        observer.on_cancelled(2);
    }

    #[test]
    fn test_stats_observer() {
        let observer = StatsObserver::new();
        let error = io::Error::other("test");

        observer.on_attempt_start(1, 3);
        observer.on_retry_scheduled(1, &error, Duration::from_millis(100));
        observer.on_attempt_start(2, 3);
        observer.on_success(2, Duration::from_millis(500));

        assert_eq!(observer.attempt_starts(), 2);
        assert_eq!(observer.retries(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.exhaustions(), 0);
        assert_eq!(observer.stops(), 0);
    }

    #[test]
    fn test_stats_observer_stop_and_cancel() {
        let observer = StatsObserver::new();
        let error = io::Error::other("test");

        observer.on_stopped(1, Termination::Unauthorized, Some(&error));
        observer.on_stopped(2, Termination::CancelledByHandler, None);
        observer.on_cancelled(1);

        assert_eq!(observer.stops(), 2);
        assert_eq!(observer.cancellations(), 1);
    }

    #[test]
    fn test_tracing_observer_creation() {
        let observer = TracingObserver::new("open connection");
        assert_eq!(observer.operation(), "open connection");

        let default_observer = TracingObserver::default();
        assert_eq!(default_observer.operation(), "retry");
    }

    #[test]
    fn test_arc_and_box_observer() {
        let stats = Arc::new(StatsObserver::new());
        let boxed: Box<dyn RetryObserver> = Box::new(Arc::clone(&stats));
        let error = io::Error::other("test");

        boxed.on_attempt_start(1, 3);
        boxed.on_exhausted(1, &error);

        assert_eq!(stats.attempt_starts(), 1);
        assert_eq!(stats.exhaustions(), 1);
    }
}
