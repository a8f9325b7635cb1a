//! Named retry methods
//!
//! Settings refer to retry policies by name. The registry maps each name to
//! the function that builds the provider.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::retry::{ConfigurableRetryFactory, RetryLogicProvider};
use crate::types::RetryOptions;

/// Builds a provider from validated options
pub type RetryMethod = fn(&RetryOptions) -> Result<RetryLogicProvider>;

/// Case-insensitive map from retry method names to provider builders
#[derive(Debug, Clone)]
pub struct RetryMethodRegistry {
    methods: BTreeMap<String, RetryMethod>,
}

impl Default for RetryMethodRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RetryMethodRegistry {
    /// A registry without any method
    pub fn empty() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }

    /// A registry with the factory's fixed, incremental, exponential and none
    /// methods under their short and factory names
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        let fixed: RetryMethod = ConfigurableRetryFactory::create_fixed_retry_provider;
        let incremental: RetryMethod = ConfigurableRetryFactory::create_incremental_retry_provider;
        let exponential: RetryMethod = ConfigurableRetryFactory::create_exponential_retry_provider;
        let none: RetryMethod = |_| Ok(ConfigurableRetryFactory::create_none_retry_provider());

        registry.register("fixed", fixed);
        registry.register("CreateFixedRetryProvider", fixed);
        registry.register("incremental", incremental);
        registry.register("CreateIncrementalRetryProvider", incremental);
        registry.register("exponential", exponential);
        registry.register("CreateExponentialRetryProvider", exponential);
        registry.register("none", none);
        registry.register("CreateNoneRetryProvider", none);

        registry
    }

    /// Register a method, replacing any method with the same name
    pub fn register(&mut self, name: &str, method: RetryMethod) {
        self.methods.insert(name.to_ascii_lowercase(), method);
    }

    /// Whether a method is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, lowercase and sorted
    pub fn names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// Look up a method by name
    pub fn resolve(&self, name: &str) -> Result<RetryMethod> {
        self.methods
            .get(&name.trim().to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::unknown_retry_method(name, &self.names()))
    }

    /// Build a provider with the named method
    pub fn create(&self, name: &str, options: &RetryOptions) -> Result<RetryLogicProvider> {
        let method = self.resolve(name)?;
        method(options)
    }
}
