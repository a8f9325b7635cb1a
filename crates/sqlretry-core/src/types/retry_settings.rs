//! Serializable retry settings
//!
//! These types mirror the settings file: one section for opening connections
//! and one for executing commands. Durations are expressed in milliseconds.

use std::collections::BTreeSet;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::RetryOptions;

/// Complete retry settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryLogicSettings {
    /// Policy applied when opening connections
    #[serde(default)]
    pub connection: Option<RetrySectionSettings>,

    /// Policy applied when executing commands
    #[serde(default)]
    pub command: Option<RetrySectionSettings>,
}

/// One retry policy section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetrySectionSettings {
    /// Registered retry method name (fixed, incremental, exponential, none)
    #[serde(default = "default_retry_method")]
    pub retry_method: String,

    /// Total attempts including the first one
    #[serde(default = "default_number_of_tries")]
    pub number_of_tries: u32,

    /// Base or step interval in milliseconds
    #[serde(default = "default_delta_time_ms")]
    pub delta_time_ms: u64,

    /// Lower bound of every wait in milliseconds
    #[serde(default)]
    pub min_time_interval_ms: u64,

    /// Upper bound of every wait in milliseconds
    #[serde(default = "default_max_time_interval_ms")]
    pub max_time_interval_ms: u64,

    /// Comma-separated transient error numbers; the intrinsic list when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient_errors: Option<String>,

    /// Regular expression a command text must match to be retried
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_sql_condition: Option<String>,
}

impl Default for RetrySectionSettings {
    fn default() -> Self {
        Self {
            retry_method: default_retry_method(),
            number_of_tries: default_number_of_tries(),
            delta_time_ms: default_delta_time_ms(),
            min_time_interval_ms: 0,
            max_time_interval_ms: default_max_time_interval_ms(),
            transient_errors: None,
            authorized_sql_condition: None,
        }
    }
}

fn default_retry_method() -> String {
    "none".to_string()
}
fn default_number_of_tries() -> u32 {
    5
}
fn default_delta_time_ms() -> u64 {
    1000
}
fn default_max_time_interval_ms() -> u64 {
    30_000
}

impl RetrySectionSettings {
    /// Convert the section into validated retry options
    ///
    /// The authorized condition is ignored when `honor_sql_condition` is
    /// false; only command sections gate on command text.
    pub fn to_options(&self, honor_sql_condition: bool) -> Result<RetryOptions> {
        let mut builder = RetryOptions::builder()
            .number_of_tries(self.number_of_tries)
            .delta_time(Duration::from_millis(self.delta_time_ms))
            .min_time_interval(Duration::from_millis(self.min_time_interval_ms))
            .max_time_interval(Duration::from_millis(self.max_time_interval_ms));

        if let Some(list) = self.transient_errors.as_deref() {
            if !list.trim().is_empty() {
                builder = builder.transient_errors(parse_transient_errors(list)?);
            }
        }

        if honor_sql_condition {
            if let Some(pattern) = self.authorized_sql_condition.as_deref() {
                if !pattern.is_empty() {
                    let regex = Regex::new(pattern)?;
                    builder = builder.authorized_sql_condition(move |sql| regex.is_match(sql));
                }
            }
        }

        builder.build()
    }
}

/// Parse a comma-separated list of error numbers
///
/// Items are non-negative integers separated by commas; spaces and tabs
/// around them are ignored. A blank list yields an empty set.
///
/// ```rust
/// use sqlretry_core::types::parse_transient_errors;
///
/// let codes = parse_transient_errors("4060, 1205,\t233").unwrap();
/// assert_eq!(codes.into_iter().collect::<Vec<_>>(), vec![233, 1205, 4060]);
///
/// assert!(parse_transient_errors("1205,,4060").is_err());
/// assert!(parse_transient_errors("-2").is_err());
/// ```
pub fn parse_transient_errors(list: &str) -> Result<BTreeSet<i32>> {
    if list.trim_matches([' ', '\t']).is_empty() {
        return Ok(BTreeSet::new());
    }

    list.split(',')
        .map(|item| item.trim_matches([' ', '\t']))
        .map(|item| {
            if item.is_empty() {
                return Err(Error::invalid_transient_errors(list, "empty item"));
            }
            if !item.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_transient_errors(
                    list,
                    format!("'{}' is not a non-negative error number", item),
                ));
            }
            item.parse::<i32>().map_err(|e| {
                Error::invalid_transient_errors(list, format!("'{}': {}", item, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_defaults() {
        let section = RetrySectionSettings::default();
        assert_eq!(section.retry_method, "none");
        assert_eq!(section.number_of_tries, 5);
        assert_eq!(section.delta_time_ms, 1000);
        assert_eq!(section.max_time_interval_ms, 30_000);
    }

    #[test]
    fn test_settings_deserialization() {
        let yaml = r#"
connection:
  retry-method: exponential
  number-of-tries: 4
  delta-time-ms: 200
  max-time-interval-ms: 5000
  transient-errors: "4060, 40613"
command:
  retry-method: fixed
  authorized-sql-condition: "^SELECT"
"#;
        let settings: RetryLogicSettings = serde_yaml_ng::from_str(yaml).unwrap();
        let connection = settings.connection.unwrap();
        assert_eq!(connection.retry_method, "exponential");
        assert_eq!(connection.number_of_tries, 4);
        assert_eq!(connection.delta_time_ms, 200);
        assert_eq!(connection.min_time_interval_ms, 0);
        assert_eq!(connection.transient_errors.as_deref(), Some("4060, 40613"));

        let command = settings.command.unwrap();
        assert_eq!(command.retry_method, "fixed");
        assert_eq!(command.number_of_tries, 5);
        assert_eq!(command.authorized_sql_condition.as_deref(), Some("^SELECT"));
    }

    #[test]
    fn test_settings_serialization_kebab_case() {
        let settings = RetryLogicSettings {
            connection: Some(RetrySectionSettings::default()),
            command: None,
        };
        let yaml = serde_yaml_ng::to_string(&settings).unwrap();
        assert!(yaml.contains("retry-method: none"));
        assert!(yaml.contains("number-of-tries: 5"));
        assert!(!yaml.contains("transient-errors"));
    }

    #[test]
    fn test_to_options_applies_condition_only_when_honored() {
        let section = RetrySectionSettings {
            authorized_sql_condition: Some("^SELECT".to_string()),
            ..Default::default()
        };

        let options = section.to_options(true).unwrap();
        let condition = options.authorized_sql_condition().unwrap();
        assert!(condition("SELECT * FROM t"));
        assert!(!condition("UPDATE t SET x = 1"));

        let options = section.to_options(false).unwrap();
        assert!(options.authorized_sql_condition().is_none());
    }

    #[test]
    fn test_to_options_rejects_bad_regex() {
        let section = RetrySectionSettings {
            authorized_sql_condition: Some("(unclosed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            section.to_options(true),
            Err(Error::InvalidAuthorizedCondition(_))
        ));
    }

    #[test]
    fn test_to_options_rejects_out_of_range() {
        let section = RetrySectionSettings {
            number_of_tries: 0,
            ..Default::default()
        };
        assert!(section.to_options(false).unwrap_err().is_invalid_configuration());
    }

    #[test]
    fn test_parse_transient_errors() {
        let codes = parse_transient_errors(" 1204,1205 , 1222").unwrap();
        assert_eq!(codes.into_iter().collect::<Vec<_>>(), vec![1204, 1205, 1222]);

        let err = parse_transient_errors("1204, abc").unwrap_err();
        assert!(matches!(err, Error::InvalidTransientErrors { .. }));
    }

    #[test]
    fn test_parse_transient_errors_rejects_empty_items_and_negatives() {
        for list in ["1205,,4060", "1204,", ",1205", "-2", "1205, +4060", "99999999999"] {
            let err = parse_transient_errors(list).unwrap_err();
            assert!(
                matches!(err, Error::InvalidTransientErrors { .. }),
                "{list:?} should be rejected"
            );
        }
        assert!(parse_transient_errors(" \t ").unwrap().is_empty());
    }

    #[test]
    fn test_to_options_rejects_malformed_transient_list() {
        let section = RetrySectionSettings {
            transient_errors: Some("4060,,40613".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            section.to_options(false),
            Err(Error::InvalidTransientErrors { .. })
        ));
    }

    #[test]
    fn test_empty_transient_list_uses_intrinsic() {
        let section = RetrySectionSettings {
            transient_errors: Some("  ".to_string()),
            ..Default::default()
        };
        let options = section.to_options(false).unwrap();
        assert!(options.transient_errors().is_none());
    }
}
