//! CLI command implementations

pub mod schedule;
pub mod show;
pub mod simulate;
pub mod validate;
pub mod version;

use anyhow::{Context, Result};
use camino::Utf8Path;
use sqlretry_core::types::RetryLogicSettings;
use sqlretry_core::RetrySettingsLoader;

/// Load a settings file with environment overrides applied
pub(crate) fn load_settings(path: &Utf8Path) -> Result<RetryLogicSettings> {
    tracing::debug!(path = %path, "loading retry settings");
    RetrySettingsLoader::new(path)
        .load()
        .with_context(|| format!("Failed to load retry settings from {}", path))
}
