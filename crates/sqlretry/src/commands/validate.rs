//! Validate command

use anyhow::{anyhow, Result};
use sqlretry_core::config::{resolve_section, RetrySection};
use sqlretry_core::types::RetryLogicSettings;
use sqlretry_core::RetryMethodRegistry;

use crate::cli::ValidateArgs;
use crate::output;

pub fn run(args: ValidateArgs) -> Result<()> {
    let settings = super::load_settings(&args.file)?;
    let registry = RetryMethodRegistry::with_builtins();

    let problems = check_settings(&settings, &registry);
    if !problems.is_empty() {
        for (section, error) in &problems {
            output::error(&format!("{}: {}", section, error));
        }
        return Err(anyhow!(
            "{} invalid section(s) in {}",
            problems.len(),
            args.file
        ));
    }

    output::success(&format!("Retry settings are valid: {}", args.file));
    let mut defined = 0;
    for section in RetrySection::ALL {
        if let Some(s) = section.select(&settings) {
            defined += 1;
            output::kv(
                &section.to_string(),
                &format!("{} ({} tries)", s.retry_method, s.number_of_tries),
            );
        }
    }
    if defined == 0 {
        output::warning("No retry sections defined; operations will not be retried");
    }

    Ok(())
}

/// Resolve every defined section, collecting the failures
pub(crate) fn check_settings(
    settings: &RetryLogicSettings,
    registry: &RetryMethodRegistry,
) -> Vec<(RetrySection, sqlretry_core::Error)> {
    RetrySection::ALL
        .into_iter()
        .filter_map(|section| {
            let section_settings = section.select(settings)?;
            resolve_section(section, Some(section_settings), registry)
                .err()
                .map(|e| (section, e))
        })
        .collect()
}
