//! Factory for the built-in retry logic providers

use std::sync::Arc;

use crate::error::Result;
use crate::types::RetryOptions;

use super::intervals::{IntervalEnumerator, IntervalStrategy};
use super::logic::{RetryLogic, TransientPredicate};
use super::predicates::{TransientErrorCodes, INTRINSIC_TRANSIENT_ERRORS};
use super::provider::RetryLogicProvider;

/// Builds providers for the fixed, incremental, exponential and none policies
///
/// # Example
///
/// ```rust
/// use sqlretry_core::retry::ConfigurableRetryFactory;
/// use sqlretry_core::types::RetryOptions;
///
/// let options = RetryOptions::builder().number_of_tries(4).build().unwrap();
/// let provider = ConfigurableRetryFactory::create_exponential_retry_provider(&options).unwrap();
///
/// assert!(ConfigurableRetryFactory::is_retriable(&provider));
/// assert!(!ConfigurableRetryFactory::is_retriable(
///     &ConfigurableRetryFactory::create_none_retry_provider()
/// ));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurableRetryFactory;

impl ConfigurableRetryFactory {
    /// Wait the same interval before every retry
    pub fn create_fixed_retry_provider(options: &RetryOptions) -> Result<RetryLogicProvider> {
        Self::create_retry_provider(IntervalStrategy::Fixed, options)
    }

    /// Wait `delta_time * n` before the n-th retry
    pub fn create_incremental_retry_provider(
        options: &RetryOptions,
    ) -> Result<RetryLogicProvider> {
        Self::create_retry_provider(IntervalStrategy::Incremental, options)
    }

    /// Double the wait on every retry, with jitter
    pub fn create_exponential_retry_provider(
        options: &RetryOptions,
    ) -> Result<RetryLogicProvider> {
        Self::create_retry_provider(IntervalStrategy::Exponential, options)
    }

    /// A provider that runs the operation once and never retries
    pub fn create_none_retry_provider() -> RetryLogicProvider {
        RetryLogicProvider::new(RetryLogic::none())
    }

    /// Build a provider for any strategy
    pub fn create_retry_provider(
        strategy: IntervalStrategy,
        options: &RetryOptions,
    ) -> Result<RetryLogicProvider> {
        if strategy == IntervalStrategy::None {
            return Ok(Self::create_none_retry_provider());
        }

        let intervals = IntervalEnumerator::new(
            strategy,
            options.delta_time(),
            options.max_time_interval(),
            options.min_time_interval(),
        )?;

        let transient: TransientPredicate = match options.transient_errors() {
            Some(codes) => Arc::new(TransientErrorCodes::with_codes(codes.iter().copied())),
            None => Arc::new(TransientErrorCodes::intrinsic()),
        };

        let logic = RetryLogic::new(
            options.number_of_tries(),
            intervals,
            transient,
            options.authorized_sql_condition().cloned(),
        )?;

        tracing::debug!(
            strategy = %strategy,
            number_of_tries = options.number_of_tries(),
            "created retry logic provider"
        );

        Ok(RetryLogicProvider::new(logic))
    }

    /// False for providers built around the none strategy
    pub fn is_retriable(provider: &RetryLogicProvider) -> bool {
        provider.retry_logic().intervals().strategy() != IntervalStrategy::None
    }

    /// The error numbers retried when no list is configured
    pub fn intrinsic_transient_errors() -> &'static [i32] {
        INTRINSIC_TRANSIENT_ERRORS
    }
}
