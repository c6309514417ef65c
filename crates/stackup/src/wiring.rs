//! Builds runnable lifecycle engines from a deployment configuration.
//!
//! Package-manager commands go through a sudo-wrapped runner; everything
//! else (service tools, the database client, the pip listing) runs as the
//! invoking user.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use command_runner::{LocalRunner, Runner, SudoRunner};
use pkg_manager::{for_family, InstalledCache};
use service_lifecycle::{
    identity, DbAdmin, EngineContext, InitializerRegistry, Lifecycle, Orchestrator, ServiceDirs,
    StackPlan,
};
use stackup_config::{
    compute_shared_params, DeploymentConfig, FileSecretStore, SecretStore, Transformer,
};

const DB_PASSWORD_LENGTH: usize = 8;

pub fn load_config(path: &Path) -> Result<DeploymentConfig> {
    DeploymentConfig::load(path)
        .with_context(|| format!("failed to load deployment config {}", path.display()))
}

pub fn load_plan(path: Option<&Path>) -> Result<StackPlan> {
    match path {
        Some(path) => StackPlan::load(path)
            .with_context(|| format!("failed to load stack plan {}", path.display())),
        None => Ok(StackPlan::builtin()),
    }
}

pub fn secrets_path(cfg: &DeploymentConfig) -> PathBuf {
    match &cfg.secrets_file {
        Some(path) => path.clone(),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("stackup")
            .join("secrets.yaml"),
    }
}

/// Wire up one lifecycle engine per planned service
pub fn build_orchestrator(cfg: &DeploymentConfig, plan: StackPlan) -> Result<Orchestrator> {
    let local: Arc<dyn Runner> = Arc::new(LocalRunner);
    let privileged: Arc<dyn Runner> = Arc::new(SudoRunner::new(LocalRunner));

    let packages = for_family(cfg.distro, cfg.keep_packages, privileged);
    let cache = Arc::new(InstalledCache::new(local.clone()));
    let secrets = FileSecretStore::open(secrets_path(cfg))?;

    let db_password =
        secrets.get_or_create("database_password", "the database administrator", DB_PASSWORD_LENGTH)?;
    let db = DbAdmin::new(local.clone(), &cfg.database, db_password);

    let wait = Duration::from_secs(cfg.service_wait_seconds);

    let mut lifecycles = Vec::with_capacity(plan.services.len());
    for spec in plan.services {
        let params = compute_shared_params(cfg, Some(&spec.name), &secrets)?;
        let dirs = ServiceDirs::for_service(cfg, &spec.name);

        let mut initializers = InitializerRegistry::new();
        let transformer = if spec.name == identity::SERVICE_NAME {
            let init_runner = local.clone();
            let init_bin = dirs.bin_dir.clone();
            let init_params = params.clone();
            initializers.register(identity::SERVICE_NAME, move || {
                Box::new(identity::IdentityInitializer::new(
                    init_runner.clone(),
                    &init_bin,
                    init_params.clone(),
                ))
            });
            identity::transformer(&dirs.template_dir, &params, db.dsn(identity::DB_NAME))
        } else {
            Transformer::new(&dirs.template_dir)
        };

        let context = EngineContext {
            runner: local.clone(),
            packages: packages.clone(),
            cache: cache.clone(),
            initializers: Arc::new(initializers),
            db: db.clone(),
        };
        lifecycles.push(Lifecycle::new(spec, dirs, context, transformer, params, wait));
    }
    Ok(Orchestrator::new(lifecycles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_secrets_file_wins_over_default() {
        let cfg: DeploymentConfig = serde_yaml::from_str(
            "host_ip: 10.0.0.1\ndistro: debian\nsecrets_file: /tmp/custom-secrets.yaml\n",
        )
        .unwrap();
        assert_eq!(
            secrets_path(&cfg),
            PathBuf::from("/tmp/custom-secrets.yaml")
        );
    }

    #[test]
    fn builds_engines_for_the_builtin_plan() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            "host_ip: 10.0.0.1\ndistro: debian\nsecrets_file: {}/secrets.yaml\n",
            dir.path().display()
        );
        let cfg: DeploymentConfig = serde_yaml::from_str(&yaml).unwrap();
        let orchestrator = build_orchestrator(&cfg, StackPlan::builtin()).unwrap();
        assert_eq!(
            orchestrator.deploy_order().unwrap(),
            [identity::SERVICE_NAME]
        );
    }
}
