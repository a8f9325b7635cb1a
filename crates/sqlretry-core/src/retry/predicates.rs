//! Transient error classification
//!
//! Operation errors expose the numeric server error codes they carry through
//! the [`CodedError`] trait. A [`RetryPredicate`] decides from those codes (or
//! from anything else about the error) whether a failure is transient and
//! therefore worth another attempt.

use std::collections::BTreeSet;
use std::error::Error;

/// Server error numbers that are retried when no explicit list is configured
///
/// These cover login failures against paused or warming pools, lock and
/// deadlock victims, throttling and resource-governance rejections.
pub const INTRINSIC_TRANSIENT_ERRORS: &[i32] = &[
    233,   // connection established but the login process failed (shared memory)
    997,   // connection established but the login process failed (named pipes)
    1204,  // the engine cannot obtain a LOCK resource at this time
    1205,  // deadlock victim
    1222,  // lock request time out period exceeded
    4060,  // cannot open database requested by the login
    4221,  // login to read-secondary failed due to long wait
    10928, // resource limit for the database has been reached
    10929, // server too busy to support requests for this database
    40143, // service encountered an error processing the request
    40197, // service encountered an error processing the request
    40501, // service is currently busy
    40540, // service encountered an error processing the request
    40613, // database is not currently available
    42108, // SQL pool is paused
    42109, // SQL pool is warming up
    49918, // not enough resources to process request
    49919, // too many create or update operations in progress
    49920, // too many operations in progress
];

/// An operation failure that carries server error numbers
///
/// A single server failure may report several errors at once; the failure is
/// transient if any of them is.
///
/// # Example
///
/// ```rust
/// use sqlretry_core::retry::CodedError;
///
/// #[derive(Debug)]
/// struct ServerError {
///     number: i32,
/// }
///
/// impl std::fmt::Display for ServerError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "server error {}", self.number)
///     }
/// }
///
/// impl std::error::Error for ServerError {}
///
/// impl CodedError for ServerError {
///     fn error_codes(&self) -> Vec<i32> {
///         vec![self.number]
///     }
/// }
/// ```
pub trait CodedError: Error + Send + Sync {
    /// All server error numbers reported by this failure
    fn error_codes(&self) -> Vec<i32>;

    /// Whether this failure must never be retried regardless of its codes
    ///
    /// A session that the server asked not to reconnect is the typical case.
    fn suppresses_retry(&self) -> bool {
        false
    }
}

impl CodedError for std::io::Error {
    fn error_codes(&self) -> Vec<i32> {
        self.raw_os_error().into_iter().collect()
    }
}

/// A predicate that determines whether an error should be retried
///
/// The predicate is consulted on every failure; its answer is never cached
/// across attempts.
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    /// Determine whether the given error should be retried
    fn should_retry(&self, error: &E) -> bool;
}

/// A predicate that always returns true (all errors are retryable)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// A predicate that never retries (no errors are retryable)
#[derive(Debug, Clone, Copy)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// A predicate that uses a closure to determine retryability
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    /// Create a new closure-based predicate
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> RetryPredicate<dyn CodedError> for ClosurePredicate<F>
where
    F: Fn(&dyn CodedError) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &(dyn CodedError + 'static)) -> bool {
        (self.predicate)(error)
    }
}

/// Retries failures whose server error numbers are in a configured set
#[derive(Debug, Clone)]
pub struct TransientErrorCodes {
    codes: BTreeSet<i32>,
}

impl TransientErrorCodes {
    /// Create a predicate from the intrinsic transient error list
    pub fn intrinsic() -> Self {
        Self::with_codes(INTRINSIC_TRANSIENT_ERRORS.iter().copied())
    }

    /// Create a predicate with custom transient error numbers
    pub fn with_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// Check if an error number is transient
    pub fn is_transient_code(&self, code: i32) -> bool {
        self.codes.contains(&code)
    }

    /// The configured error numbers, ascending
    pub fn codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.codes.iter().copied()
    }
}

impl RetryPredicate<dyn CodedError> for TransientErrorCodes {
    fn should_retry(&self, error: &(dyn CodedError + 'static)) -> bool {
        if error.suppresses_retry() {
            return false;
        }

        match error
            .error_codes()
            .into_iter()
            .find(|code| self.is_transient_code(*code))
        {
            Some(code) => {
                tracing::debug!(code, error = %error, "found a transient error");
                true
            }
            None => false,
        }
    }
}
