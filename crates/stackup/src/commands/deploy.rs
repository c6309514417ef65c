use std::path::Path;

use anyhow::{Context, Result};

use crate::wiring;

pub async fn run(config_path: &Path, plan_path: Option<&Path>) -> Result<()> {
    let cfg = wiring::load_config(config_path)?;
    let plan = wiring::load_plan(plan_path)?;
    let mut orchestrator = wiring::build_orchestrator(&cfg, plan)?;

    let order = orchestrator.deploy_order()?;
    println!("Deploying {} service(s): {}", order.len(), order.join(", "));

    orchestrator.deploy().await.context("deployment failed")?;

    for (name, state) in orchestrator.states() {
        println!("✓ {name}: {state}");
    }
    Ok(())
}
