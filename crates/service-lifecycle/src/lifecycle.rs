//! The per-service lifecycle engine

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use command_runner::{Command, Runner};
use pkg_manager::{InstalledCache, PackageManager};
use stackup_config::{
    substitute_placeholders, DeploymentConfig, SharedParams, Transformer,
};
use tracing::{debug, info};

use crate::{DbAdmin, Error, InitializerRegistry, Result, ServiceSpec, ServiceState};

/// Trace marker meaning "first-run initialization has completed"
const INIT_MARKER: &str = "initialized";

/// Subdirectory of a service's app dir holding its executables
const BIN_SUBDIR: &str = "bin";
/// Subdirectory of a service's app dir holding committed templates
const TEMPLATE_SUBDIR: &str = "etc";

/// Filesystem layout for one service
#[derive(Debug, Clone)]
pub struct ServiceDirs {
    /// The service's application directory
    pub app_dir: PathBuf,
    /// Executables, `<app_dir>/bin`
    pub bin_dir: PathBuf,
    /// Committed config templates, `<app_dir>/etc`
    pub template_dir: PathBuf,
    /// Where rendered configs are written
    pub config_dir: PathBuf,
    /// Where trace markers live
    pub trace_dir: PathBuf,
}

impl ServiceDirs {
    /// Lay out directories for a named service under the deployment roots
    pub fn for_service(cfg: &DeploymentConfig, name: &str) -> Self {
        let app_dir = cfg.dirs.app_root.join(name);
        Self {
            bin_dir: app_dir.join(BIN_SUBDIR),
            template_dir: app_dir.join(TEMPLATE_SUBDIR),
            app_dir,
            config_dir: cfg.dirs.config_root.join(name),
            trace_dir: cfg.dirs.trace_root.join(name),
        }
    }

    /// Path of the trace marker gating first-run initialization
    pub fn init_marker(&self) -> PathBuf {
        self.trace_dir.join(INIT_MARKER)
    }
}

/// Shared machinery every lifecycle engine borrows
#[derive(Clone)]
pub struct EngineContext {
    /// Runner for service-level commands (sync tools, clients, the app)
    pub runner: Arc<dyn Runner>,
    /// The distribution package manager
    pub packages: Arc<dyn PackageManager>,
    /// Installed-package cache, invalidated here after bulk mutations
    pub cache: Arc<InstalledCache>,
    /// Late-bound initializer registry
    pub initializers: Arc<InitializerRegistry>,
    /// Database administrator
    pub db: DbAdmin,
}

/// Drives one service through install, configure, start, and post-start
/// initialization.
pub struct Lifecycle {
    spec: ServiceSpec,
    dirs: ServiceDirs,
    context: EngineContext,
    transformer: Transformer,
    params: SharedParams,
    wait: Duration,
    state: ServiceState,
}

impl Lifecycle {
    /// Create an engine for one service.
    ///
    /// The warm-up wait is clamped to a minimum of one second.
    pub fn new(
        spec: ServiceSpec,
        dirs: ServiceDirs,
        context: EngineContext,
        transformer: Transformer,
        params: SharedParams,
        wait: Duration,
    ) -> Self {
        Self {
            spec,
            dirs,
            context,
            transformer,
            params,
            wait: wait.max(Duration::from_secs(1)),
            state: ServiceState::NotInstalled,
        }
    }

    /// The service name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Names of services that must be driven before this one
    pub fn dependencies(&self) -> &[String] {
        &self.spec.dependencies
    }

    /// Whether the global keep-packages policy is set on the adapter
    pub fn keep_packages(&self) -> bool {
        self.context.packages.keep_packages()
    }

    /// Path of the trace marker gating first-run initialization
    pub fn init_marker(&self) -> PathBuf {
        self.dirs.init_marker()
    }

    /// The parameter map commands and configs are templated against
    fn param_map(&self) -> HashMap<String, String> {
        let mut map = self.params.to_param_map();
        map.insert("APP_DIR".to_string(), self.dirs.app_dir.display().to_string());
        map.insert("BIN_DIR".to_string(), self.dirs.bin_dir.display().to_string());
        map.insert(
            "CONFIG_DIR".to_string(),
            self.dirs.config_dir.display().to_string(),
        );
        if let Some(first) = self.spec.configs.first() {
            map.insert(
                "CONFIG_FILE".to_string(),
                self.dirs.config_dir.join(first).display().to_string(),
            );
        }
        map
    }

    /// Install host packages and run post-install preparation.
    ///
    /// The installed-package cache is invalidated once after the whole
    /// batch; the adapter itself never does this.
    pub async fn install(&mut self) -> Result<()> {
        info!(service = %self.spec.name, packages = self.spec.packages.len(), "installing");
        for pkg in &self.spec.packages {
            self.context.packages.install(pkg).await?;
        }
        if !self.spec.packages.is_empty() {
            self.context.cache.invalidate();
        }
        self.post_install().await?;
        self.state = ServiceState::Installed;
        Ok(())
    }

    /// Drop and recreate the service database, then sync its schema
    async fn post_install(&self) -> Result<()> {
        let Some(db_name) = &self.spec.database else {
            return Ok(());
        };
        self.context.db.drop_database(db_name).await?;
        self.context.db.create_database(db_name).await?;
        self.sync_database().await?;
        Ok(())
    }

    async fn sync_database(&self) -> Result<()> {
        if self.spec.sync_command.is_empty() {
            return Ok(());
        }
        info!(service = %self.spec.name, "syncing database schema");
        let params = self.param_map();
        let mut tokens = Vec::with_capacity(self.spec.sync_command.len());
        for token in &self.spec.sync_command {
            tokens.push(substitute_placeholders(token, &params, &self.spec.name)?);
        }
        let Some((program, args)) = tokens.split_first() else {
            return Ok(());
        };
        let cmd = Command::new(program)
            .args(args.iter().cloned())
            .current_dir(&self.dirs.bin_dir);
        self.context.runner.run_checked(cmd).await?;
        Ok(())
    }

    /// Render and write every config artifact, in spec order
    pub async fn configure(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.dirs.config_dir)?;
        let params = self.param_map();
        for config in &self.spec.configs {
            let (source, rendered) = self.transformer.render(config, &params)?;
            let target = self.dirs.config_dir.join(config);
            debug!(source = %source.display(), target = %target.display(), "writing config");
            std::fs::write(&target, rendered)?;
        }
        info!(service = %self.spec.name, configs = self.spec.configs.len(), "configured");
        self.state = ServiceState::Configured;
        Ok(())
    }

    /// Launch the service process, if the spec declares one
    pub async fn start(&mut self) -> Result<()> {
        if let Some(app) = &self.spec.app {
            let params = self.param_map();
            let binary = substitute_placeholders(&app.binary, &params, &self.spec.name)?;
            let mut cmd = Command::new(binary).current_dir(&self.dirs.bin_dir);
            for arg in &app.args {
                cmd = cmd.arg(substitute_placeholders(arg, &params, &self.spec.name)?);
            }
            let pid = self.context.runner.spawn(cmd).await?;
            info!(service = %self.spec.name, pid, "started");
        }
        self.state = ServiceState::Started;
        Ok(())
    }

    /// One-time initialization after the service is up.
    ///
    /// Gated by the trace marker: if it exists this is a no-op, making the
    /// transition idempotent across process restarts and repeated runs.
    /// Otherwise the engine waits out the warm-up period, resolves the
    /// late-bound initializer, and writes the marker only after it
    /// succeeds, so a failed run retries the whole initialization.
    pub async fn post_start(&mut self) -> Result<()> {
        let marker = self.init_marker();
        if marker.is_file() {
            debug!(service = %self.spec.name, "already initialized");
            self.state = ServiceState::Initialized;
            return Ok(());
        }

        if let Some(id) = &self.spec.initializer {
            info!(
                service = %self.spec.name,
                seconds = self.wait.as_secs(),
                "waiting for service to come up before first-time init"
            );
            smol::Timer::after(self.wait).await;

            // Resolved late: the client this uses exists only post-install
            let initializer = self.context.initializers.resolve(id)?;
            let directives = self.load_bootstrap()?;
            debug!(service = %self.spec.name, "running initializer");
            initializer
                .initialize(&directives)
                .await
                .map_err(|e| Error::Initialization {
                    service: self.spec.name.clone(),
                    reason: e.to_string(),
                })?;

            std::fs::create_dir_all(&self.dirs.trace_dir)?;
            std::fs::write(&marker, b"")?;
            info!(
                marker = %marker.display(),
                "initialization done; delete the marker to run it again"
            );
        }

        self.state = ServiceState::Initialized;
        Ok(())
    }

    /// Remove this service's packages, returning the names removed.
    ///
    /// Callers own the keep-packages policy: this must not be invoked
    /// while it is set.
    pub async fn uninstall(&mut self) -> Result<Vec<String>> {
        let removed = self
            .context
            .packages
            .remove_batch(&self.spec.packages)
            .await?;
        if !removed.is_empty() {
            self.context.cache.invalidate();
        }
        self.state = ServiceState::NotInstalled;
        Ok(removed)
    }

    fn load_bootstrap(&self) -> Result<serde_yaml::Value> {
        match &self.spec.bootstrap {
            Some(file) => {
                let path = self.dirs.template_dir.join(file);
                let contents = std::fs::read_to_string(&path)?;
                Ok(serde_yaml::from_str(&contents)?)
            }
            None => Ok(serde_yaml::Value::Null),
        }
    }
}
