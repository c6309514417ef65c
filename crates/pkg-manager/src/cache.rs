//! Installed-package cache over the deployment's Python environment

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use command_runner::{Command, Runner};
use pep440_rs::Version;
use pep508_rs::{Requirement, VersionOrUrl};
use tracing::debug;

use crate::{Error, Result};

const FREEZE_ARGS: &[&str] = &["freeze", "--local"];

/// A memoized snapshot of the packages pip reports as installed.
///
/// The snapshot is computed lazily on the first query and reused until
/// [`InstalledCache::invalidate`] discards it wholesale — there is no
/// partial invalidation. Components that install or remove packages must
/// invalidate explicitly afterwards; the adapters deliberately do not.
pub struct InstalledCache {
    runner: Arc<dyn Runner>,
    snapshot: Mutex<Option<Vec<Requirement>>>,
}

impl InstalledCache {
    /// Create an empty cache that lists packages through the given runner
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        Self {
            runner,
            snapshot: Mutex::new(None),
        }
    }

    /// Discard the snapshot; the next query recomputes it
    pub fn invalidate(&self) {
        debug!("invalidating installed-package snapshot");
        *self.snapshot.lock().unwrap() = None;
    }

    /// Whether a package (optionally at an acceptable version) is installed
    pub async fn is_installed(
        &self,
        pip: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<bool> {
        Ok(self.get_installed(pip, name, version).await?.is_some())
    }

    /// Look up an installed package by case-insensitive name.
    ///
    /// Without a version, the first record with a matching name wins. With
    /// one, the record must also accept that version under its widened
    /// at-most constraint. A miss is an absent result, never an error.
    pub async fn get_installed(
        &self,
        pip: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<Requirement>> {
        let wanted = version
            .map(|v| {
                Version::from_str(v).map_err(|e| Error::InvalidVersion {
                    version: v.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        for req in self.snapshot(pip).await? {
            if !req.name.to_string().eq_ignore_ascii_case(name) {
                continue;
            }
            match &wanted {
                None => return Ok(Some(req)),
                Some(version) => {
                    if let Some(VersionOrUrl::VersionSpecifier(specifiers)) = &req.version_or_url {
                        if specifiers.contains(version) {
                            return Ok(Some(req));
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    async fn snapshot(&self, pip: &str) -> Result<Vec<Requirement>> {
        if let Some(snapshot) = self.snapshot.lock().unwrap().clone() {
            return Ok(snapshot);
        }
        let listed = self.list_installed(pip).await?;
        *self.snapshot.lock().unwrap() = Some(listed.clone());
        Ok(listed)
    }

    async fn list_installed(&self, pip: &str) -> Result<Vec<Requirement>> {
        debug!(pip, "listing installed packages");
        let cmd = Command::new(pip).args(FREEZE_ARGS.iter().copied());
        let output = self.runner.run_checked(cmd).await?;
        Ok(parse_listing(&output.stdout))
    }
}

/// Parse `pip freeze` style output into widened requirements.
///
/// Exact pins (`name==version`) are rewritten to at-most constraints
/// (`name<=version`) so later version-satisfaction queries accept any
/// version at or below the installed one. Blank lines, comments, editable
/// entries, and lines that fail to parse are dropped.
fn parse_listing(stdout: &str) -> Vec<Requirement> {
    let mut installed = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Editable installs have no meaningful version
        if line.starts_with("-e") {
            continue;
        }
        let widened = line.replace("==", "<=");
        if let Ok(req) = Requirement::from_str(&widened) {
            installed.push(req);
        }
    }
    installed
}
