//! Error types for the retry execution engine
//!
//! A protected operation either succeeds, fails fast with its own untouched
//! error, fails with an aggregate of every attempt's error, or is cancelled
//! from outside.

use std::error::Error;
use std::fmt;

/// Why a retry sequence stopped with an aggregate failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every allowed attempt failed
    Exhausted,

    /// A `retrying` handler set the cancel flag
    CancelledByHandler,

    /// A later failure was not transient
    NonTransient,

    /// The command text did not satisfy the authorized condition
    Unauthorized,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Termination::Exhausted => "exhausted",
            Termination::CancelledByHandler => "cancelled by handler",
            Termination::NonTransient => "non-transient error",
            Termination::Unauthorized => "unauthorized operation",
        };
        write!(f, "{}", reason)
    }
}

/// All failures of one invocation, in the order they happened
#[derive(Debug)]
pub struct AggregateRetryError<E> {
    /// Why the sequence stopped
    pub reason: Termination,
    /// Every attempt's error, oldest first
    pub causes: Vec<E>,
    /// Configured total attempts of the policy
    pub number_of_tries: u32,
}

impl<E> AggregateRetryError<E> {
    /// The error of the final attempt
    pub fn last(&self) -> Option<&E> {
        self.causes.last()
    }
}

impl<E: fmt::Display> fmt::Display for AggregateRetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Termination::CancelledByHandler => write!(
                f,
                "The retry has been canceled at attempt {}.",
                self.causes.len()
            )?,
            Termination::Exhausted => write!(
                f,
                "The number of retries has exceeded the maximum of {} attempt(s).",
                self.number_of_tries
            )?,
            reason => write!(
                f,
                "The retry stopped after {} attempt(s): {}.",
                self.causes.len(),
                reason
            )?,
        }
        if let Some(last) = self.last() {
            write!(f, " Last error: {}", last)?;
        }
        Ok(())
    }
}

/// Errors that can occur during retry execution
///
/// The error type is generic over `E`, the underlying error type from the
/// operation being retried.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The first failure was not retryable and is returned untouched
    Original(E),

    /// The retry sequence stopped after accumulating failures
    Aggregate(AggregateRetryError<E>),

    /// The external cancellation token fired
    Cancelled {
        /// Number of attempts started before cancellation
        attempts: u32,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Original(source) => write!(f, "{}", source),
            RetryError::Aggregate(aggregate) => write!(f, "{}", aggregate),
            RetryError::Cancelled { attempts } => {
                write!(f, "operation cancelled after {} attempt(s)", attempts)
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Original(source) => Some(source),
            RetryError::Aggregate(aggregate) => aggregate.last().map(|e| e as &(dyn Error + 'static)),
            RetryError::Cancelled { .. } => None,
        }
    }
}

impl<E> RetryError<E> {
    /// Create an aggregate error
    pub fn aggregate(reason: Termination, causes: Vec<E>, number_of_tries: u32) -> Self {
        RetryError::Aggregate(AggregateRetryError {
            reason,
            causes,
            number_of_tries,
        })
    }

    /// Create an external cancellation error
    pub fn cancelled(attempts: u32) -> Self {
        RetryError::Cancelled { attempts }
    }

    /// Why an aggregate failure stopped, `None` for other variants
    pub fn termination(&self) -> Option<Termination> {
        match self {
            RetryError::Aggregate(aggregate) => Some(aggregate.reason),
            _ => None,
        }
    }

    /// Check if every allowed attempt failed
    pub fn is_exhausted(&self) -> bool {
        self.termination() == Some(Termination::Exhausted)
    }

    /// Check if a `retrying` handler stopped the sequence
    pub fn is_cancelled_by_handler(&self) -> bool {
        self.termination() == Some(Termination::CancelledByHandler)
    }

    /// Check if the external cancellation token stopped the sequence
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Check if this is the untouched first failure
    pub fn is_original(&self) -> bool {
        matches!(self, RetryError::Original(_))
    }

    /// The accumulated failures of an aggregate, empty otherwise
    pub fn causes(&self) -> &[E] {
        match self {
            RetryError::Aggregate(aggregate) => &aggregate.causes,
            _ => &[],
        }
    }

    /// Get the untouched first failure, consuming this error
    pub fn into_original(self) -> Option<E> {
        match self {
            RetryError::Original(source) => Some(source),
            _ => None,
        }
    }

    /// Map the error type using a closure
    pub fn map_err<F, E2>(self, mut f: F) -> RetryError<E2>
    where
        F: FnMut(E) -> E2,
    {
        match self {
            RetryError::Original(source) => RetryError::Original(f(source)),
            RetryError::Aggregate(aggregate) => RetryError::Aggregate(AggregateRetryError {
                reason: aggregate.reason,
                causes: aggregate.causes.into_iter().map(f).collect(),
                number_of_tries: aggregate.number_of_tries,
            }),
            RetryError::Cancelled { attempts } => RetryError::Cancelled { attempts },
        }
    }
}
