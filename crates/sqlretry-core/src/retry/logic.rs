//! Retry decision state machine
//!
//! A [`RetryLogic`] is consulted after each failed attempt. It checks the
//! authorized condition against the command text, then the transient
//! predicate against the error, then whether another attempt is allowed, and
//! hands back the wait before that attempt.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::types::{validate_number_of_tries, AuthorizedCondition};

use super::intervals::{IntervalEnumerator, IntervalStrategy};
use super::predicates::{CodedError, NeverRetry, RetryPredicate};

/// Shared transient-error predicate
pub type TransientPredicate = Arc<dyn RetryPredicate<dyn CodedError>>;

/// Where a retry logic is in its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No failure seen since the last reset
    Fresh,
    /// At least one retry granted
    Retrying,
    /// The last failure came after the final allowed attempt
    Exhausted,
    /// The command text failed the authorized condition
    AuthorizationDenied,
    /// The last failure was not transient
    NonTransient,
}

/// Outcome of consulting the retry logic after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then run the operation again
    Retry(Duration),
    /// Stop; the state says why
    Stop(RetryState),
}

/// Point-in-time view of a retry logic's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLogicSnapshot {
    /// Retries granted so far
    pub current: u32,
    /// Configured total attempts
    pub number_of_tries: u32,
    /// State after the last decision
    pub state: RetryState,
}

/// Per-invocation retry state plus the policy it enforces
///
/// Cloning is a deep copy of the counters and the enumerator position; the
/// predicates are immutable and shared.
#[derive(Clone)]
pub struct RetryLogic {
    number_of_tries: u32,
    current: u32,
    state: RetryState,
    intervals: IntervalEnumerator,
    transient_predicate: TransientPredicate,
    authorized_condition: Option<AuthorizedCondition>,
}

impl RetryLogic {
    /// Create a retry logic after validating the number of tries
    pub fn new(
        number_of_tries: u32,
        intervals: IntervalEnumerator,
        transient_predicate: TransientPredicate,
        authorized_condition: Option<AuthorizedCondition>,
    ) -> Result<Self> {
        validate_number_of_tries(number_of_tries)?;

        Ok(Self {
            number_of_tries,
            current: 0,
            state: RetryState::Fresh,
            intervals,
            transient_predicate,
            authorized_condition,
        })
    }

    /// A logic that never retries
    pub fn none() -> Self {
        Self {
            number_of_tries: 1,
            current: 0,
            state: RetryState::Fresh,
            intervals: IntervalEnumerator::none(),
            transient_predicate: Arc::new(NeverRetry),
            authorized_condition: None,
        }
    }

    /// Configured total attempts including the first
    pub fn number_of_tries(&self) -> u32 {
        self.number_of_tries
    }

    /// Retries granted since the last reset
    pub fn current(&self) -> u32 {
        self.current
    }

    /// State after the last decision
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// The owned interval enumerator
    pub fn intervals(&self) -> &IntervalEnumerator {
        &self.intervals
    }

    /// Capture the counters for diagnostics
    pub fn snapshot(&self) -> RetryLogicSnapshot {
        RetryLogicSnapshot {
            current: self.current,
            number_of_tries: self.number_of_tries,
            state: self.state,
        }
    }

    /// Return to `Fresh` and restart the interval sequence
    pub fn reset(&mut self) {
        self.current = 0;
        self.state = RetryState::Fresh;
        self.intervals.reset();
    }

    /// Whether the command text allows a retry
    ///
    /// Operations without command text (opening a connection) always pass.
    pub fn retry_condition(&self, command_text: Option<&str>) -> bool {
        match (&self.authorized_condition, command_text) {
            (Some(condition), Some(text)) => condition(text),
            _ => true,
        }
    }

    /// Whether the error is transient
    pub fn is_transient(&self, error: &(dyn CodedError + 'static)) -> bool {
        self.transient_predicate.should_retry(error)
    }

    /// Advance to the next interval if another attempt is allowed
    pub fn try_next_interval(&mut self) -> Option<Duration> {
        if self.current + 1 < self.number_of_tries {
            self.current += 1;
            self.intervals.move_next();
            self.state = RetryState::Retrying;
            Some(self.intervals.current())
        } else {
            self.state = RetryState::Exhausted;
            None
        }
    }

    /// Decide what to do after a failure
    ///
    /// Both predicates are evaluated on every call.
    pub fn decide(
        &mut self,
        command_text: Option<&str>,
        error: &(dyn CodedError + 'static),
    ) -> RetryDecision {
        if !self.retry_condition(command_text) {
            self.state = RetryState::AuthorizationDenied;
            return RetryDecision::Stop(self.state);
        }

        if !self.is_transient(error) {
            self.state = RetryState::NonTransient;
            return RetryDecision::Stop(self.state);
        }

        match self.try_next_interval() {
            Some(delay) => RetryDecision::Retry(delay),
            None => RetryDecision::Stop(self.state),
        }
    }

    /// Whether this logic can ever grant a retry
    pub fn is_retriable(&self) -> bool {
        self.number_of_tries > 1 && self.intervals.strategy() != IntervalStrategy::None
    }
}

impl fmt::Debug for RetryLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLogic")
            .field("number_of_tries", &self.number_of_tries)
            .field("current", &self.current)
            .field("state", &self.state)
            .field("intervals", &self.intervals)
            .field("authorized_condition", &self.authorized_condition.is_some())
            .finish()
    }
}
