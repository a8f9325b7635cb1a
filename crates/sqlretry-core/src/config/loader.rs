//! Retry settings loader
//!
//! Loads retry settings with the following precedence (low to high):
//! 1. Section defaults
//! 2. Settings file (YAML)
//! 3. Environment variables (SQLRETRY_* prefix)

use std::env;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{Error, Result};
use crate::types::{RetryLogicSettings, RetrySectionSettings};

/// Overrides the connection section's number of tries
pub const ENV_CONNECTION_NUMBER_OF_TRIES: &str = "SQLRETRY_CONNECTION_NUMBER_OF_TRIES";
/// Overrides the command section's number of tries
pub const ENV_COMMAND_NUMBER_OF_TRIES: &str = "SQLRETRY_COMMAND_NUMBER_OF_TRIES";
/// Overrides the connection section's retry method
pub const ENV_CONNECTION_RETRY_METHOD: &str = "SQLRETRY_CONNECTION_RETRY_METHOD";
/// Overrides the command section's retry method
pub const ENV_COMMAND_RETRY_METHOD: &str = "SQLRETRY_COMMAND_RETRY_METHOD";

/// Reads retry settings files
#[derive(Debug, Clone)]
pub struct RetrySettingsLoader {
    path: Utf8PathBuf,
}

impl RetrySettingsLoader {
    /// Create a loader for a settings file
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The settings file path
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the file and apply environment overrides
    pub fn load(&self) -> Result<RetryLogicSettings> {
        if !self.path.exists() {
            return Err(Error::config_not_found(self.path.as_str()));
        }

        let content = fs::read_to_string(&self.path)?;
        let settings = Self::from_yaml(&content)?;
        tracing::debug!(path = %self.path, "loaded retry settings");

        Self::apply_env_overrides(settings)
    }

    /// Parse settings from YAML text, without environment overrides
    pub fn from_yaml(content: &str) -> Result<RetryLogicSettings> {
        if content.trim().is_empty() {
            return Ok(RetryLogicSettings::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Apply `SQLRETRY_*` environment variables
    ///
    /// An override for a missing section creates that section from defaults.
    pub fn apply_env_overrides(mut settings: RetryLogicSettings) -> Result<RetryLogicSettings> {
        apply_section_overrides(
            &mut settings.connection,
            ENV_CONNECTION_NUMBER_OF_TRIES,
            ENV_CONNECTION_RETRY_METHOD,
        )?;
        apply_section_overrides(
            &mut settings.command,
            ENV_COMMAND_NUMBER_OF_TRIES,
            ENV_COMMAND_RETRY_METHOD,
        )?;
        Ok(settings)
    }
}

fn apply_section_overrides(
    section: &mut Option<RetrySectionSettings>,
    tries_var: &str,
    method_var: &str,
) -> Result<()> {
    if let Ok(val) = env::var(tries_var) {
        section.get_or_insert_with(RetrySectionSettings::default).number_of_tries =
            val.trim().parse().map_err(|_| {
                Error::invalid_configuration(tries_var, format!("'{}' is not a valid number", val))
            })?;
    }

    if let Ok(val) = env::var(method_var) {
        section
            .get_or_insert_with(RetrySectionSettings::default)
            .retry_method = val.trim().to_string();
    }

    Ok(())
}
