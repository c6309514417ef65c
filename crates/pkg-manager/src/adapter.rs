//! The package-manager capability set

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use command_runner::Runner;
use serde::{Deserialize, Serialize};

use crate::{AptManager, DnfManager, Package, Result};

/// Supported distribution families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    /// apt-based distributions (Debian, Ubuntu)
    Debian,
    /// dnf-based distributions (Fedora, RHEL, CentOS)
    Redhat,
}

impl fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DistroFamily::Debian => "debian",
            DistroFamily::Redhat => "redhat",
        })
    }
}

/// Uniform install/remove operations for one distribution family.
///
/// Construction takes the shared `keep_packages` policy flag, but the
/// adapter itself never consults it for removal: callers must not invoke
/// [`PackageManager::remove_batch`] while the global keep policy is set.
/// Adapters also never invalidate the [`crate::InstalledCache`] — cache
/// coherence is the mutating caller's responsibility.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// The global keep-packages policy this adapter was constructed with
    fn keep_packages(&self) -> bool;

    /// Install one package.
    ///
    /// The package is first offered to [`PackageManager::install_special`];
    /// if unhandled, the formatted `name[<sep>version]` token is passed to
    /// the distribution's install subcommand with elevated privilege and a
    /// non-interactive environment. A non-zero exit is fatal.
    async fn install(&self, pkg: &Package) -> Result<()>;

    /// Remove a batch of packages, returning the names actually removed.
    ///
    /// Non-removable descriptors are skipped. Each remaining package is
    /// offered to [`PackageManager::remove_special`] first; everything
    /// unhandled is accumulated into one batched remove command. If
    /// anything was removed by either path and the auto-remove policy is
    /// on, a single cleanup command follows. Removal is not transactional:
    /// a failing batch leaves already-removed packages in place and the
    /// error propagates.
    async fn remove_batch(&self, pkgs: &[Package]) -> Result<Vec<String>>;

    /// Hook for packages that install through another subsystem.
    ///
    /// Returns true when the package was handled and the ordinary install
    /// command must be skipped.
    async fn install_special(&self, _pkg: &Package) -> Result<bool> {
        Ok(false)
    }

    /// Hook for packages that are removed through another subsystem
    async fn remove_special(&self, _pkg: &Package) -> Result<bool> {
        Ok(false)
    }
}

/// Format a package token the way the distribution's tool expects
pub fn format_package(name: &str, version: Option<&str>, separator: char) -> String {
    match version {
        Some(version) => format!("{name}{separator}{version}"),
        None => name.to_string(),
    }
}

/// Walk a removal batch through the skip/special/accumulate sequence.
///
/// Returns the formatted tokens for the batched command and the names
/// removed by either path. Shared by every adapter so the batching
/// semantics cannot drift between families.
pub(crate) async fn collect_removals<M>(
    manager: &M,
    pkgs: &[Package],
    separator: char,
) -> Result<(Vec<String>, Vec<String>)>
where
    M: PackageManager + ?Sized,
{
    let mut tokens = Vec::new();
    let mut removed = Vec::new();
    for pkg in pkgs {
        if !pkg.removable {
            continue;
        }
        if manager.remove_special(pkg).await? {
            removed.push(pkg.name.clone());
            continue;
        }
        tokens.push(format_package(&pkg.name, pkg.version.as_deref(), separator));
        removed.push(pkg.name.clone());
    }
    Ok((tokens, removed))
}

/// Construct the adapter for a distribution family
pub fn for_family(
    family: DistroFamily,
    keep_packages: bool,
    runner: Arc<dyn Runner>,
) -> Arc<dyn PackageManager> {
    match family {
        DistroFamily::Debian => Arc::new(AptManager::new(runner, keep_packages)),
        DistroFamily::Redhat => Arc::new(DnfManager::new(runner, keep_packages)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_and_without_version() {
        assert_eq!(format_package("curl", None, '='), "curl");
        assert_eq!(format_package("curl", Some("7.81.0"), '='), "curl=7.81.0");
        assert_eq!(format_package("vim", Some("9.0"), '-'), "vim-9.0");
    }

    #[test]
    fn family_parses_from_config() {
        let family: DistroFamily = serde_yaml::from_str("debian").unwrap();
        assert_eq!(family, DistroFamily::Debian);
    }

    /// Adapter whose special hook claims one specific package
    struct Hooked;

    #[async_trait]
    impl PackageManager for Hooked {
        fn keep_packages(&self) -> bool {
            false
        }

        async fn install(&self, _pkg: &Package) -> Result<()> {
            Ok(())
        }

        async fn remove_batch(&self, pkgs: &[Package]) -> Result<Vec<String>> {
            let (_, removed) = collect_removals(self, pkgs, '=').await?;
            Ok(removed)
        }

        async fn remove_special(&self, pkg: &Package) -> Result<bool> {
            Ok(pkg.name == "special-db")
        }
    }

    #[test]
    fn special_hook_bypasses_batch_but_counts_as_removed() {
        smol::block_on(async {
            let pkgs = vec![
                Package::new("special-db"),
                Package::new("vim"),
                Package::permanent("sudo"),
            ];
            let (tokens, removed) = collect_removals(&Hooked, &pkgs, '=').await.unwrap();
            assert_eq!(tokens, ["vim"]);
            assert_eq!(removed, ["special-db", "vim"]);
        });
    }
}
