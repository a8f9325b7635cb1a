//! Show command

use anyhow::Result;
use sqlretry_core::config::RetrySection;
use sqlretry_core::retry::INTRINSIC_TRANSIENT_ERRORS;
use sqlretry_core::types::RetrySectionSettings;

use crate::cli::ShowArgs;
use crate::output;

pub fn run(args: ShowArgs) -> Result<()> {
    let settings = super::load_settings(&args.file)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    for section in RetrySection::ALL {
        output::header(&format!("{} retry logic", section));
        match section.select(&settings) {
            Some(s) => {
                for (key, value) in describe_section(section, s) {
                    output::kv(key, &value);
                }
            }
            None => output::info("Not configured; operations run once"),
        }
    }

    Ok(())
}

/// Human-readable key/value lines for a section
pub(crate) fn describe_section(
    section: RetrySection,
    settings: &RetrySectionSettings,
) -> Vec<(&'static str, String)> {
    let transient_errors = match settings.transient_errors.as_deref() {
        Some(list) if !list.trim().is_empty() => list.trim().to_string(),
        _ => format!("intrinsic ({} numbers)", INTRINSIC_TRANSIENT_ERRORS.len()),
    };

    let condition = match (&settings.authorized_sql_condition, section.honors_sql_condition()) {
        (Some(pattern), true) => pattern.clone(),
        (Some(_), false) => "ignored for connections".to_string(),
        (None, _) => "-".to_string(),
    };

    vec![
        ("Method", settings.retry_method.clone()),
        ("Number of tries", settings.number_of_tries.to_string()),
        ("Delta time", format!("{}ms", settings.delta_time_ms)),
        ("Min interval", format!("{}ms", settings.min_time_interval_ms)),
        ("Max interval", format!("{}ms", settings.max_time_interval_ms)),
        ("Transient errors", transient_errors),
        ("Authorized SQL condition", condition),
    ]
}
