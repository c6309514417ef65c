use std::path::Path;

use anyhow::Result;
use service_lifecycle::DependencyGraph;

use crate::wiring;

pub async fn run(config_path: &Path, plan_path: Option<&Path>) -> Result<()> {
    println!("Validating {}...", config_path.display());

    let cfg = wiring::load_config(config_path)?;
    println!("✓ Deployment configuration valid");
    println!("  Host: {}", cfg.host_ip);
    println!("  Distribution family: {}", cfg.distro);
    println!("  Keep packages: {}", cfg.keep_packages);
    println!("  Secrets file: {}", wiring::secrets_path(&cfg).display());

    let plan = wiring::load_plan(plan_path)?;
    let graph = DependencyGraph::new(plan.services.iter().map(|svc| {
        (
            svc.name.as_str(),
            svc.dependencies.iter().map(String::as_str),
        )
    }))?;
    let order = graph.topological_order()?;
    println!("✓ Stack plan valid");
    println!("  Services: {}", plan.services.len());
    println!("  Deploy order: {}", order.join(", "));
    Ok(())
}
