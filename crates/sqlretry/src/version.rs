//! Version information for the sqlretry CLI

use std::fmt;

use serde::{Deserialize, Serialize};

/// Versions of the CLI and of the retry library it links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub core_version: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            core_version: sqlretry_core::VERSION.to_string(),
        }
    }

    /// Whether the CLI was built against a library of another version
    pub fn core_differs(&self) -> bool {
        self.version != self.core_version
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sqlretry {}", self.version)?;
        if self.core_differs() {
            write!(f, " (sqlretry-core {})", self.core_version)?;
        }
        Ok(())
    }
}
