//! Resolves configured retry providers for connections and commands
//!
//! A bad settings section never fails the caller: it is logged and replaced
//! by the none provider, so operations run exactly once.

use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;

use crate::error::Result;
use crate::retry::{ConfigurableRetryFactory, RetryLogicProvider, TracingObserver};
use crate::types::{RetryLogicSettings, RetrySectionSettings};

use super::loader::RetrySettingsLoader;
use super::registry::RetryMethodRegistry;

/// The two places a retry policy applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrySection {
    /// Opening a connection
    Connection,
    /// Executing a command
    Command,
}

impl RetrySection {
    /// Both sections, connection first
    pub const ALL: [RetrySection; 2] = [RetrySection::Connection, RetrySection::Command];

    /// Only commands have text for the authorized condition to inspect
    pub fn honors_sql_condition(self) -> bool {
        self == RetrySection::Command
    }

    /// This section's settings, if present
    pub fn select(self, settings: &RetryLogicSettings) -> Option<&RetrySectionSettings> {
        match self {
            RetrySection::Connection => settings.connection.as_ref(),
            RetrySection::Command => settings.command.as_ref(),
        }
    }
}

impl fmt::Display for RetrySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrySection::Connection => write!(f, "connection"),
            RetrySection::Command => write!(f, "command"),
        }
    }
}

/// Build the provider for one section
///
/// A missing section yields the none provider. Errors are returned as-is; the
/// manager is the layer that falls back.
pub fn resolve_section(
    section: RetrySection,
    settings: Option<&RetrySectionSettings>,
    registry: &RetryMethodRegistry,
) -> Result<RetryLogicProvider> {
    let Some(settings) = settings else {
        return Ok(ConfigurableRetryFactory::create_none_retry_provider());
    };

    let options = settings.to_options(section.honors_sql_condition())?;
    registry.create(&settings.retry_method, &options)
}

/// Connection and command providers resolved from settings
#[derive(Debug, Clone)]
pub struct RetryLogicManager {
    connection: Arc<RetryLogicProvider>,
    command: Arc<RetryLogicProvider>,
}

/// None providers for both sections, with the same logging as resolved ones
impl Default for RetryLogicManager {
    fn default() -> Self {
        Self::from_settings(&RetryLogicSettings::default())
    }
}

impl RetryLogicManager {
    /// Resolve both sections with the built-in retry methods
    pub fn from_settings(settings: &RetryLogicSettings) -> Self {
        Self::with_registry(settings, &RetryMethodRegistry::with_builtins())
    }

    /// Resolve both sections with a custom registry
    pub fn with_registry(settings: &RetryLogicSettings, registry: &RetryMethodRegistry) -> Self {
        Self {
            connection: Arc::new(Self::create_provider(
                RetrySection::Connection,
                settings,
                registry,
            )),
            command: Arc::new(Self::create_provider(RetrySection::Command, settings, registry)),
        }
    }

    /// Load a settings file and resolve both sections
    ///
    /// An unreadable file yields none providers for both sections.
    pub fn load(path: &Utf8Path) -> Self {
        match RetrySettingsLoader::new(path).load() {
            Ok(settings) => {
                tracing::info!(path = %path, "loaded retry logic settings");
                Self::from_settings(&settings)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "failed to load retry logic settings, retries are disabled"
                );
                Self::default()
            }
        }
    }

    /// Provider applied when opening connections
    pub fn connection_provider(&self) -> Arc<RetryLogicProvider> {
        Arc::clone(&self.connection)
    }

    /// Provider applied when executing commands
    pub fn command_provider(&self) -> Arc<RetryLogicProvider> {
        Arc::clone(&self.command)
    }

    /// Provider for a section
    pub fn provider(&self, section: RetrySection) -> Arc<RetryLogicProvider> {
        match section {
            RetrySection::Connection => self.connection_provider(),
            RetrySection::Command => self.command_provider(),
        }
    }

    fn create_provider(
        section: RetrySection,
        settings: &RetryLogicSettings,
        registry: &RetryMethodRegistry,
    ) -> RetryLogicProvider {
        let section_settings = section.select(settings);
        let provider = match resolve_section(section, section_settings, registry) {
            Ok(provider) => {
                if let Some(s) = section_settings {
                    tracing::info!(
                        section = %section,
                        retry_method = %s.retry_method,
                        number_of_tries = s.number_of_tries,
                        "resolved retry logic provider"
                    );
                }
                provider
            }
            Err(e) => {
                tracing::warn!(
                    section = %section,
                    error = %e,
                    "invalid retry logic settings, falling back to no retries"
                );
                ConfigurableRetryFactory::create_none_retry_provider()
            }
        };

        let provider = provider.with_observer(TracingObserver::new(section.to_string()));
        provider.subscribe_retrying(move |args| {
            let error = args
                .exceptions
                .last()
                .map(|e| e.to_string())
                .unwrap_or_default();
            tracing::info!(
                section = %section,
                retry_count = args.retry_count,
                delay_ms = args.delay.as_millis() as u64,
                error = %error,
                "retrying"
            );
        });
        provider
    }
}
