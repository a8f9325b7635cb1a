//! Retry interval enumeration
//!
//! An [`IntervalEnumerator`] produces the wait duration before each retry.
//! The sequence is unbounded; the retry logic that owns the enumerator decides
//! when to stop asking for more intervals.

use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};

/// Largest accepted value for the gap, minimum, and maximum intervals
pub const MAX_TIME_INTERVAL: Duration = Duration::from_secs(120);

/// Upper bound of the random offset added to exponential intervals
pub const EXPONENTIAL_JITTER: Duration = Duration::from_millis(250);

/// Backoff strategy used to compute successive intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalStrategy {
    /// Always zero; used by the non-retrying provider
    None,

    /// The gap interval on every retry
    Fixed,

    /// The gap interval multiplied by the retry number
    Incremental,

    /// The gap interval doubled on every retry, plus jitter
    Exponential,
}

impl std::fmt::Display for IntervalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntervalStrategy::None => "none",
            IntervalStrategy::Fixed => "fixed",
            IntervalStrategy::Incremental => "incremental",
            IntervalStrategy::Exponential => "exponential",
        };
        write!(f, "{}", name)
    }
}

/// Validate the time bounds an enumerator is built from
///
/// Out-of-range values are rejected rather than clamped.
pub fn validate_time_intervals(
    gap_time_interval: Duration,
    max_time_interval: Duration,
    min_time_interval: Duration,
) -> Result<()> {
    if gap_time_interval > MAX_TIME_INTERVAL {
        return Err(Error::invalid_configuration(
            "delta_time",
            format!(
                "{:?} is outside the accepted range [0s, {:?}]",
                gap_time_interval, MAX_TIME_INTERVAL
            ),
        ));
    }

    if min_time_interval > MAX_TIME_INTERVAL {
        return Err(Error::invalid_configuration(
            "min_time_interval",
            format!(
                "{:?} is outside the accepted range [0s, {:?}]",
                min_time_interval, MAX_TIME_INTERVAL
            ),
        ));
    }

    if max_time_interval > MAX_TIME_INTERVAL {
        return Err(Error::invalid_configuration(
            "max_time_interval",
            format!(
                "{:?} is outside the accepted range [0s, {:?}]",
                max_time_interval, MAX_TIME_INTERVAL
            ),
        ));
    }

    if min_time_interval > max_time_interval {
        return Err(Error::invalid_configuration(
            "min_time_interval",
            format!(
                "{:?} is greater than max_time_interval {:?}",
                min_time_interval, max_time_interval
            ),
        ));
    }

    Ok(())
}

/// Stateful, restartable sequence of retry intervals
///
/// Cloning copies the current position, so a clone continues from where the
/// original was.
///
/// # Example
///
/// ```rust
/// use sqlretry_core::retry::{IntervalEnumerator, IntervalStrategy};
/// use std::time::Duration;
///
/// let mut intervals = IntervalEnumerator::new(
///     IntervalStrategy::Incremental,
///     Duration::from_millis(100),
///     Duration::from_secs(10),
///     Duration::ZERO,
/// )
/// .unwrap();
///
/// intervals.move_next();
/// assert_eq!(intervals.current(), Duration::from_millis(100));
/// intervals.move_next();
/// assert_eq!(intervals.current(), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct IntervalEnumerator {
    strategy: IntervalStrategy,
    gap_time_interval: Duration,
    max_time_interval: Duration,
    min_time_interval: Duration,
    jitter: bool,
    attempt: u32,
    current: Duration,
}

impl IntervalEnumerator {
    /// Create an enumerator after validating its bounds
    pub fn new(
        strategy: IntervalStrategy,
        gap_time_interval: Duration,
        max_time_interval: Duration,
        min_time_interval: Duration,
    ) -> Result<Self> {
        validate_time_intervals(gap_time_interval, max_time_interval, min_time_interval)?;

        Ok(Self {
            strategy,
            gap_time_interval,
            max_time_interval,
            min_time_interval,
            jitter: true,
            attempt: 0,
            current: Duration::ZERO,
        })
    }

    /// An enumerator that only ever yields zero
    pub fn none() -> Self {
        Self {
            strategy: IntervalStrategy::None,
            gap_time_interval: Duration::ZERO,
            max_time_interval: Duration::ZERO,
            min_time_interval: Duration::ZERO,
            jitter: false,
            attempt: 0,
            current: Duration::ZERO,
        }
    }

    /// Disable the random offset of exponential intervals
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// The backoff strategy
    pub fn strategy(&self) -> IntervalStrategy {
        self.strategy
    }

    /// The configured gap (delta) interval
    pub fn gap_time_interval(&self) -> Duration {
        self.gap_time_interval
    }

    /// Lower bound of every produced interval
    pub fn min_time_interval(&self) -> Duration {
        self.min_time_interval
    }

    /// Upper bound of every produced interval
    pub fn max_time_interval(&self) -> Duration {
        self.max_time_interval
    }

    /// The last produced interval, zero before the first `move_next`
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Number of `move_next` calls since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Advance to the next interval
    ///
    /// The sequence never ends, so this always returns `true`.
    pub fn move_next(&mut self) -> bool {
        self.attempt = self.attempt.saturating_add(1);
        self.current = self.clamp(self.next_interval());
        true
    }

    /// Restart the sequence
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current = Duration::ZERO;
    }

    /// The next `count` intervals, computed on a fresh copy
    pub fn preview(&self, count: usize) -> Vec<Duration> {
        let mut fresh = self.clone();
        fresh.reset();
        (0..count)
            .map(|_| {
                fresh.move_next();
                fresh.current()
            })
            .collect()
    }

    /// The strategy's interval for the current attempt, before clamping
    fn next_interval(&self) -> Duration {
        match self.strategy {
            IntervalStrategy::None => Duration::ZERO,

            IntervalStrategy::Fixed => self.gap_time_interval,

            IntervalStrategy::Incremental => self.gap_time_interval.saturating_mul(self.attempt),

            IntervalStrategy::Exponential => {
                let exponent = self.attempt.saturating_sub(1);
                let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
                let base = self.gap_time_interval.saturating_mul(factor);
                base.saturating_add(self.random_jitter())
                    .min(self.max_time_interval)
            }
        }
    }

    fn random_jitter(&self) -> Duration {
        if !self.jitter || self.gap_time_interval.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = EXPONENTIAL_JITTER.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.min_time_interval, self.max_time_interval)
    }
}
