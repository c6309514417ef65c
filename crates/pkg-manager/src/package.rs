//! Package descriptors

use serde::{Deserialize, Serialize};

/// A package to install or remove.
///
/// Identity is the name, compared case-insensitively. A descriptor with
/// `removable` false is skipped by batch removal and must never reach the
/// underlying package manager's remove subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name as the distribution knows it
    pub name: String,
    /// Exact version to request, or `None` for whatever is current
    #[serde(default)]
    pub version: Option<String>,
    /// Whether remove operations may touch this package
    #[serde(default = "default_removable")]
    pub removable: bool,
}

fn default_removable() -> bool {
    true
}

impl Package {
    /// A removable package with no version constraint
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            removable: true,
        }
    }

    /// A removable package pinned to an exact version
    pub fn versioned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            removable: true,
        }
    }

    /// A package that removal must leave in place
    pub fn permanent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            removable: false,
        }
    }

    /// Case-insensitive identity key
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_removable() {
        assert!(Package::new("curl").removable);
        assert!(!Package::permanent("sudo").removable);
    }

    #[test]
    fn key_is_case_insensitive() {
        assert_eq!(Package::new("LibSSL").key(), Package::new("libssl").key());
    }

    #[test]
    fn deserializes_with_defaults() {
        let pkg: Package = serde_yaml::from_str("name: curl").unwrap();
        assert_eq!(pkg.name, "curl");
        assert_eq!(pkg.version, None);
        assert!(pkg.removable);
    }
}
