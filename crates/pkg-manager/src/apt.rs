//! Debian-family adapter

use std::sync::Arc;

use async_trait::async_trait;
use command_runner::{Command, Runner};
use tracing::info;

use crate::adapter::{collect_removals, format_package, PackageManager};
use crate::{Error, Package, Result};

const APT_GET: &str = "apt-get";
const APT_INSTALL: &[&str] = &["install", "-y"];
// Purge rather than remove, so configuration files go too
const APT_DO_REMOVE: &[&str] = &["purge", "-y"];
const APT_AUTOREMOVE: &[&str] = &["autoremove", "-y"];

// apt separates name and version with an equals sign
const VERSION_SEP: char = '=';

// Suppress debconf prompts during unattended runs
const ENV_ADDITIONS: (&str, &str) = ("DEBIAN_FRONTEND", "noninteractive");

/// Package manager for apt-based distributions
pub struct AptManager {
    runner: Arc<dyn Runner>,
    keep_packages: bool,
    auto_remove: bool,
}

impl AptManager {
    /// Create an adapter running apt through the given runner
    pub fn new(runner: Arc<dyn Runner>, keep_packages: bool) -> Self {
        Self {
            runner,
            keep_packages,
            auto_remove: true,
        }
    }

    fn apt_command(&self, action: &[&str]) -> Command {
        Command::new(APT_GET)
            .args(action.iter().copied())
            .env(ENV_ADDITIONS.0, ENV_ADDITIONS.1)
    }
}

#[async_trait]
impl PackageManager for AptManager {
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
        info!(package = %token, "installing via apt");
        let cmd = self.apt_command(APT_INSTALL).arg(token);
        self.runner.run_checked(cmd).await?;
        Ok(())
    }

    async fn remove_batch(&self, pkgs: &[Package]) -> Result<Vec<String>> {
        let (tokens, removed) = collect_removals(self, pkgs, VERSION_SEP).await?;
        if !tokens.is_empty() {
            info!(count = tokens.len(), "removing batch via apt");
            let cmd = self.apt_command(APT_DO_REMOVE).args(tokens);
            self.runner.run_checked(cmd).await?;
        }
        if !removed.is_empty() && self.auto_remove {
            self.runner
                .run_checked(self.apt_command(APT_AUTOREMOVE))
                .await?;
        }
        Ok(removed)
    }
}
