//! Version command

use crate::cli::VersionArgs;
use crate::version::VersionInfo;
use anyhow::Result;

pub fn run(args: VersionArgs) -> Result<()> {
    let info = VersionInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_matches_workspace_version() {
        let info = VersionInfo::current();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.core_version, sqlretry_core::VERSION);
        // Both crates take their version from the workspace
        assert!(!info.core_differs());
        assert_eq!(info.to_string(), format!("sqlretry {}", info.version));
    }

    #[test]
    fn test_display_mentions_core_when_versions_differ() {
        let info = VersionInfo {
            version: "1.2.3".to_string(),
            core_version: "1.3.0".to_string(),
        };
        assert_eq!(info.to_string(), "sqlretry 1.2.3 (sqlretry-core 1.3.0)");
    }

    #[test]
    fn test_json_has_only_version_fields() {
        let info = VersionInfo::current();
        let value: serde_json::Value = serde_json::to_value(&info).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["version"], info.version.as_str());

        let parsed: VersionInfo = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, info);
    }
}
