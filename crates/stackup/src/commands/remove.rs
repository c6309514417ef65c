use std::path::Path;

use anyhow::{Context, Result};

use crate::wiring;

pub async fn run(config_path: &Path, plan_path: Option<&Path>) -> Result<()> {
    let cfg = wiring::load_config(config_path)?;
    let plan = wiring::load_plan(plan_path)?;

    if cfg.keep_packages {
        println!("keep_packages is set; host packages will be left in place");
        return Ok(());
    }

    let mut orchestrator = wiring::build_orchestrator(&cfg, plan)?;
    let removed = orchestrator.remove().await.context("removal failed")?;

    if removed.is_empty() {
        println!("No packages removed");
    } else {
        println!("Removed {} package(s): {}", removed.len(), removed.join(", "));
    }
    Ok(())
}
