//! Retry options supplied when building a retry logic provider

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::validate_time_intervals;

/// Largest accepted number of tries
pub const MAX_NUMBER_OF_TRIES: u32 = 60;

/// Predicate over a command's text deciding whether it may be retried
pub type AuthorizedCondition = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Immutable retry configuration
///
/// Build with [`RetryOptions::builder`]; `build` rejects out-of-range values.
///
/// # Example
///
/// ```rust
/// use sqlretry_core::types::RetryOptions;
/// use std::time::Duration;
///
/// let options = RetryOptions::builder()
///     .number_of_tries(5)
///     .delta_time(Duration::from_secs(1))
///     .max_time_interval(Duration::from_secs(20))
///     .transient_errors([4060, 1205])
///     .authorized_sql_condition(|sql| sql.trim_start().starts_with("SELECT"))
///     .build()
///     .unwrap();
///
/// assert_eq!(options.number_of_tries(), 5);
/// ```
#[derive(Clone)]
pub struct RetryOptions {
    number_of_tries: u32,
    delta_time: Duration,
    min_time_interval: Duration,
    max_time_interval: Duration,
    transient_errors: Option<BTreeSet<i32>>,
    authorized_sql_condition: Option<AuthorizedCondition>,
}

impl RetryOptions {
    /// Start building retry options from the defaults
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::default()
    }

    /// Total attempts including the first one
    pub fn number_of_tries(&self) -> u32 {
        self.number_of_tries
    }

    /// Base or step interval of the backoff
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Lower bound of every wait
    pub fn min_time_interval(&self) -> Duration {
        self.min_time_interval
    }

    /// Upper bound of every wait
    pub fn max_time_interval(&self) -> Duration {
        self.max_time_interval
    }

    /// Transient error numbers; `None` means the intrinsic list
    pub fn transient_errors(&self) -> Option<&BTreeSet<i32>> {
        self.transient_errors.as_ref()
    }

    /// Condition a command text must satisfy to be retried
    pub fn authorized_sql_condition(&self) -> Option<&AuthorizedCondition> {
        self.authorized_sql_condition.as_ref()
    }

    /// Check every bound
    pub fn validate(&self) -> Result<()> {
        validate_number_of_tries(self.number_of_tries)?;
        validate_time_intervals(
            self.delta_time,
            self.max_time_interval,
            self.min_time_interval,
        )
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("number_of_tries", &self.number_of_tries)
            .field("delta_time", &self.delta_time)
            .field("min_time_interval", &self.min_time_interval)
            .field("max_time_interval", &self.max_time_interval)
            .field("transient_errors", &self.transient_errors)
            .field(
                "authorized_sql_condition",
                &self.authorized_sql_condition.as_ref().map(|_| "<condition>"),
            )
            .finish()
    }
}

/// Reject a number of tries outside `1..=MAX_NUMBER_OF_TRIES`
pub fn validate_number_of_tries(number_of_tries: u32) -> Result<()> {
    if !(1..=MAX_NUMBER_OF_TRIES).contains(&number_of_tries) {
        return Err(Error::invalid_configuration(
            "number_of_tries",
            format!(
                "{} is outside the accepted range [1, {}]",
                number_of_tries, MAX_NUMBER_OF_TRIES
            ),
        ));
    }
    Ok(())
}

/// Builder for [`RetryOptions`]
#[derive(Clone)]
pub struct RetryOptionsBuilder {
    options: RetryOptions,
}

impl Default for RetryOptionsBuilder {
    fn default() -> Self {
        Self {
            options: RetryOptions {
                number_of_tries: 5,
                delta_time: Duration::from_secs(1),
                min_time_interval: Duration::ZERO,
                max_time_interval: Duration::from_secs(30),
                transient_errors: None,
                authorized_sql_condition: None,
            },
        }
    }
}

impl RetryOptionsBuilder {
    /// Set the total number of attempts
    pub fn number_of_tries(mut self, number_of_tries: u32) -> Self {
        self.options.number_of_tries = number_of_tries;
        self
    }

    /// Set the base or step interval
    pub fn delta_time(mut self, delta_time: Duration) -> Self {
        self.options.delta_time = delta_time;
        self
    }

    /// Set the lower bound of every wait
    pub fn min_time_interval(mut self, min_time_interval: Duration) -> Self {
        self.options.min_time_interval = min_time_interval;
        self
    }

    /// Set the upper bound of every wait
    pub fn max_time_interval(mut self, max_time_interval: Duration) -> Self {
        self.options.max_time_interval = max_time_interval;
        self
    }

    /// Replace the intrinsic transient error list
    pub fn transient_errors(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.options.transient_errors = Some(codes.into_iter().collect());
        self
    }

    /// Only retry commands whose text satisfies `condition`
    pub fn authorized_sql_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.options.authorized_sql_condition = Some(Arc::new(condition));
        self
    }

    /// Set an already shared authorized condition
    pub fn authorized_condition(mut self, condition: Option<AuthorizedCondition>) -> Self {
        self.options.authorized_sql_condition = condition;
        self
    }

    /// Validate and build the options
    pub fn build(self) -> Result<RetryOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
