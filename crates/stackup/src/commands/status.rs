use std::path::Path;

use anyhow::Result;
use service_lifecycle::ServiceDirs;

use crate::wiring;

pub async fn run(config_path: &Path, plan_path: Option<&Path>) -> Result<()> {
    let cfg = wiring::load_config(config_path)?;
    let plan = wiring::load_plan(plan_path)?;

    println!("{:<20} {:<14} DEPENDS ON", "SERVICE", "INITIALIZED");
    for spec in &plan.services {
        let dirs = ServiceDirs::for_service(&cfg, &spec.name);
        let initialized = if dirs.init_marker().is_file() {
            "yes"
        } else {
            "no"
        };
        let deps = if spec.dependencies.is_empty() {
            "-".to_string()
        } else {
            spec.dependencies.join(", ")
        };
        println!("{:<20} {:<14} {deps}", spec.name, initialized);
    }
    Ok(())
}
