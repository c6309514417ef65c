//! RedHat-family adapter

use std::sync::Arc;

use async_trait::async_trait;
use command_runner::{Command, Runner};
use tracing::info;

use crate::adapter::{collect_removals, format_package, PackageManager};
use crate::{Error, Package, Result};

const DNF: &str = "dnf";
const DNF_INSTALL: &[&str] = &["install", "-y"];
const DNF_REMOVE: &[&str] = &["remove", "-y"];
const DNF_AUTOREMOVE: &[&str] = &["autoremove", "-y"];

// dnf separates name and version with a dash
const VERSION_SEP: char = '-';

/// Package manager for dnf-based distributions
pub struct DnfManager {
    runner: Arc<dyn Runner>,
    keep_packages: bool,
    auto_remove: bool,
}

impl DnfManager {
    /// Create an adapter running dnf through the given runner
    pub fn new(runner: Arc<dyn Runner>, keep_packages: bool) -> Self {
        Self {
            runner,
            keep_packages,
            auto_remove: true,
        }
    }

    fn dnf_command(&self, action: &[&str]) -> Command {
        Command::new(DNF).args(action.iter().copied())
    }
}

#[async_trait]
impl PackageManager for DnfManager {
    fn keep_packages(&self) -> bool {
        self.keep_packages
    }

    async fn install(&self, pkg: &Package) -> Result<()> {
        if pkg.name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.install_special(pkg).await? {
            return Ok(());
        }
        let token = format_package(&pkg.name, pkg.version.as_deref(), VERSION_SEP);
        info!(package = %token, "installing via dnf");
        let cmd = self.dnf_command(DNF_INSTALL).arg(token);
        self.runner.run_checked(cmd).await?;
        Ok(())
    }

    async fn remove_batch(&self, pkgs: &[Package]) -> Result<Vec<String>> {
        let (tokens, removed) = collect_removals(self, pkgs, VERSION_SEP).await?;
        if !tokens.is_empty() {
            info!(count = tokens.len(), "removing batch via dnf");
            let cmd = self.dnf_command(DNF_REMOVE).args(tokens);
            self.runner.run_checked(cmd).await?;
        }
        if !removed.is_empty() && self.auto_remove {
            self.runner
                .run_checked(self.dnf_command(DNF_AUTOREMOVE))
                .await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_runner::testing::ScriptedRunner;

    #[test]
    fn install_uses_dash_separator() {
        smol::block_on(async {
            let runner = Arc::new(ScriptedRunner::new());
            let manager = DnfManager::new(runner.clone(), false);
            manager
                .install(&Package::versioned("vim", "9.0"))
                .await
                .unwrap();
            assert_eq!(runner.command_lines(), ["dnf install -y vim-9.0"]);
        });
    }

    #[test]
    fn remove_batch_is_batched() {
        smol::block_on(async {
            let runner = Arc::new(ScriptedRunner::new());
            let manager = DnfManager::new(runner.clone(), false);
            let pkgs = vec![Package::new("vim"), Package::new("curl")];
            let removed = manager.remove_batch(&pkgs).await.unwrap();
            assert_eq!(removed, ["vim", "curl"]);
            assert_eq!(
                runner.command_lines(),
                ["dnf remove -y vim curl", "dnf autoremove -y"]
            );
        });
    }
}
