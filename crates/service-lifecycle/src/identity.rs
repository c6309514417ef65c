//! The identity service
//!
//! The platform's token and catalog authority: every other service
//! authenticates against it, so it is installed and initialized first.
//! This module carries its service spec, config adjustment routines, and
//! the bootstrap initializer that seeds tenants, users, and role grants
//! through the service's client tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use command_runner::{Command, Runner};
use pkg_manager::Package;
use stackup_config::{IniDocument, SharedParams, Transformer};
use tracing::{debug, info};

use crate::{AppSpec, Initializer, Result, ServiceSpec};

/// Service name
pub const SERVICE_NAME: &str = "identity";
/// Dedicated database, dropped then recreated at install time
pub const DB_NAME: &str = "identity";

/// Main service config
pub const ROOT_CONF: &str = "identity.conf";
const ROOT_SOURCE: &str = "identity.conf.sample";
/// Logging config
pub const LOGGING_CONF: &str = "logging.conf";
const LOGGING_SOURCE: &str = "logging.conf.sample";
/// Access-policy config; goes through generic placeholder substitution
pub const POLICY_JSON: &str = "policy.json";

/// Bootstrap descriptor controlling first-run initialization
pub const BOOTSTRAP_FN: &str = "bootstrap.yaml";

const MANAGE_TOOL: &str = "identity-manage";
const CLIENT_TOOL: &str = "identity-client";
const SERVER_BIN: &str = "identity-server";

const CATALOG_DRIVER: &str = "identity.catalog.backends.sql.Catalog";
const ADMIN_PIPELINE: &str = "token_auth admin_token_auth json_body debug crud_extension admin_service";

/// The identity service's spec
pub fn spec() -> ServiceSpec {
    ServiceSpec {
        name: SERVICE_NAME.to_string(),
        packages: vec![
            Package::new("python3"),
            Package::new("python3-mysqldb"),
            Package::permanent("openssl"),
        ],
        configs: vec![
            ROOT_CONF.to_string(),
            LOGGING_CONF.to_string(),
            POLICY_JSON.to_string(),
        ],
        database: Some(DB_NAME.to_string()),
        sync_command: vec![
            format!("%BIN_DIR%/{MANAGE_TOOL}"),
            "--config-file=%CONFIG_FILE%".to_string(),
            "db_sync".to_string(),
        ],
        app: Some(AppSpec {
            binary: format!("%BIN_DIR%/{SERVER_BIN}"),
            args: vec![
                "--config-file=%CONFIG_FILE%".to_string(),
                format!("--log-config=%CONFIG_DIR%/{LOGGING_CONF}"),
            ],
        }),
        dependencies: vec![],
        initializer: Some(SERVICE_NAME.to_string()),
        bootstrap: Some(BOOTSTRAP_FN.to_string()),
    }
}

/// Build the identity service's config transformer.
///
/// The root and logging configs manage every value they need in their
/// adjustment routines, so both are exempt from generic substitution.
pub fn transformer(
    template_dir: impl Into<PathBuf>,
    params: &SharedParams,
    db_connection: String,
) -> Transformer {
    let mut transformer = Transformer::new(template_dir);
    transformer.map_sample_source(ROOT_CONF, ROOT_SOURCE);
    transformer.map_sample_source(LOGGING_CONF, LOGGING_SOURCE);
    transformer.mark_self_managed(ROOT_CONF);
    transformer.mark_self_managed(LOGGING_CONF);

    let root_params = params.clone();
    transformer.register_adjustment(ROOT_CONF, move |contents| {
        Ok(adjust_root(contents, &root_params, &db_connection))
    });
    transformer.register_adjustment(LOGGING_CONF, |contents| Ok(adjust_logging(contents)));
    transformer
}

fn adjust_root(contents: &str, params: &SharedParams, db_connection: &str) -> String {
    let mut doc = IniDocument::parse(contents);
    doc.set("DEFAULT", "admin_token", &params.service_token);
    doc.set("DEFAULT", "admin_port", params.endpoints.admin.port);
    doc.set("DEFAULT", "public_port", params.endpoints.public.port);
    doc.set("DEFAULT", "verbose", true);
    doc.set("DEFAULT", "debug", true);
    // The launcher passes --log-config itself
    doc.remove("DEFAULT", "log_config");
    doc.set("sql", "connection", db_connection);
    doc.set("catalog", "driver", CATALOG_DRIVER);
    doc.set("pipeline:admin_api", "pipeline", ADMIN_PIPELINE);
    doc.to_string()
}

fn adjust_logging(contents: &str) -> String {
    let mut doc = IniDocument::parse(contents);
    doc.set("logger_root", "level", "DEBUG");
    doc.set("logger_root", "handlers", "devel,production");
    doc.to_string()
}

/// Seeds tenants, users, and role grants through the identity client.
///
/// Constructed late, at the point of use: the client tool it shells out
/// to only exists once the service is installed.
pub struct IdentityInitializer {
    runner: Arc<dyn Runner>,
    client: PathBuf,
    params: SharedParams,
}

impl IdentityInitializer {
    /// Create an initializer using the client under the given bin dir
    pub fn new(runner: Arc<dyn Runner>, bin_dir: &Path, params: SharedParams) -> Self {
        Self {
            runner,
            client: bin_dir.join(CLIENT_TOOL),
            params,
        }
    }

    fn client_command(&self) -> Command {
        Command::new(self.client.display().to_string())
            .env("SERVICE_ENDPOINT", &self.params.endpoints.admin.uri)
            .env("SERVICE_TOKEN", &self.params.service_token)
    }

    /// Map a password directive to the shared secret it names, falling
    /// back to the literal value for anything unrecognized
    fn resolve_password(&self, name: &str) -> String {
        match name {
            "admin_password" => self.params.admin_password.clone(),
            "service_password" => self.params.service_password.clone(),
            other => other.to_string(),
        }
    }
}

fn entries<'a>(directives: &'a serde_yaml::Value, key: &str) -> Vec<&'a serde_yaml::Value> {
    directives
        .get(key)
        .and_then(serde_yaml::Value::as_sequence)
        .map(|seq| seq.iter().collect())
        .unwrap_or_default()
}

fn field<'a>(entry: &'a serde_yaml::Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(serde_yaml::Value::as_str)
}

#[async_trait]
impl Initializer for IdentityInitializer {
    async fn initialize(&self, directives: &serde_yaml::Value) -> Result<()> {
        debug!(?directives, "initializing identity");

        for tenant in entries(directives, "tenants") {
            let Some(name) = tenant.as_str() else { continue };
            info!(tenant = name, "creating tenant");
            let cmd = self.client_command().arg("tenant-create").arg("--name").arg(name);
            self.runner.run_checked(cmd).await?;
        }

        for user in entries(directives, "users") {
            let Some(name) = field(user, "name") else { continue };
            let password = field(user, "password")
                .map(|p| self.resolve_password(p))
                .unwrap_or_default();
            info!(user = name, "creating user");
            let mut cmd = self
                .client_command()
                .arg("user-create")
                .arg("--name")
                .arg(name)
                .arg("--pass")
                .arg(password);
            if let Some(tenant) = field(user, "tenant") {
                cmd = cmd.arg("--tenant").arg(tenant);
            }
            self.runner.run_checked(cmd).await?;
        }

        for role in entries(directives, "roles") {
            let Some(name) = role.as_str() else { continue };
            info!(role = name, "creating role");
            let cmd = self.client_command().arg("role-create").arg("--name").arg(name);
            self.runner.run_checked(cmd).await?;
        }

        for grant in entries(directives, "grants") {
            let (Some(user), Some(role), Some(tenant)) = (
                field(grant, "user"),
                field(grant, "role"),
                field(grant, "tenant"),
            ) else {
                continue;
            };
            info!(user, role, tenant, "granting role");
            let cmd = self
                .client_command()
                .arg("role-grant")
                .arg("--user")
                .arg(user)
                .arg("--role")
                .arg(role)
                .arg("--tenant")
                .arg(tenant);
            self.runner.run_checked(cmd).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_runner::testing::ScriptedRunner;
    use stackup_config::{compute_shared_params, DeploymentConfig, MemorySecretStore};

    fn params() -> SharedParams {
        let cfg: DeploymentConfig =
            serde_yaml::from_str("host_ip: 10.0.0.1\ndistro: debian\n").unwrap();
        compute_shared_params(&cfg, Some(SERVICE_NAME), &MemorySecretStore::new()).unwrap()
    }

    #[test]
    fn adjust_root_sets_computed_values() {
        let params = params();
        let source = "\
[DEFAULT]
public_port = 9999
log_config = /etc/old-logging.conf

[sql]
connection = sqlite:///dev.db
";
        let adjusted = adjust_root(source, &params, "mysql://root:pw@localhost:3306/identity");
        let doc = IniDocument::parse(&adjusted);
        assert_eq!(
            doc.get("DEFAULT", "admin_token"),
            Some(params.service_token.as_str())
        );
        assert_eq!(doc.get("DEFAULT", "admin_port"), Some("35357"));
        assert_eq!(doc.get("DEFAULT", "public_port"), Some("5000"));
        assert_eq!(doc.get("DEFAULT", "log_config"), None);
        assert_eq!(
            doc.get("sql", "connection"),
            Some("mysql://root:pw@localhost:3306/identity")
        );
        assert_eq!(doc.get("catalog", "driver"), Some(CATALOG_DRIVER));
        assert_eq!(doc.get("pipeline:admin_api", "pipeline"), Some(ADMIN_PIPELINE));
    }

    #[test]
    fn adjust_root_tolerates_empty_source() {
        let params = params();
        let adjusted = adjust_root("", &params, "mysql://root@localhost/identity");
        let doc = IniDocument::parse(&adjusted);
        assert_eq!(doc.get("DEFAULT", "verbose"), Some("true"));
    }

    #[test]
    fn adjust_logging_raises_root_logger() {
        let adjusted = adjust_logging("[logger_root]\nlevel = WARNING\n");
        let doc = IniDocument::parse(&adjusted);
        assert_eq!(doc.get("logger_root", "level"), Some("DEBUG"));
        assert_eq!(doc.get("logger_root", "handlers"), Some("devel,production"));
    }

    #[test]
    fn initializer_runs_client_commands_in_order() {
        smol::block_on(async {
            let runner = Arc::new(ScriptedRunner::new());
            let params = params();
            let init = IdentityInitializer::new(
                runner.clone(),
                Path::new("/opt/stackup/identity/bin"),
                params.clone(),
            );

            let directives: serde_yaml::Value = serde_yaml::from_str(
                "\
tenants: [admin, demo]
users:
  - name: admin
    password: admin_password
    tenant: admin
roles: [admin]
grants:
  - user: admin
    role: admin
    tenant: admin
",
            )
            .unwrap();

            init.initialize(&directives).await.unwrap();

            let lines = runner.command_lines();
            assert_eq!(lines.len(), 5);
            assert!(lines[0].ends_with("identity-client tenant-create --name admin"));
            assert!(lines[1].ends_with("tenant-create --name demo"));
            assert!(lines[2].contains("user-create --name admin"));
            assert!(lines[2].contains(&params.admin_password));
            assert!(lines[3].contains("role-create --name admin"));
            assert!(lines[4].contains("role-grant --user admin --role admin --tenant admin"));

            // The client authenticates through its environment
            let env = runner.commands()[0].get_envs().clone();
            assert_eq!(
                env.get("SERVICE_ENDPOINT").map(String::as_str),
                Some(params.endpoints.admin.uri.as_str())
            );
        });
    }

    #[test]
    fn initializer_tolerates_missing_directive_keys() {
        smol::block_on(async {
            let runner = Arc::new(ScriptedRunner::new());
            let init = IdentityInitializer::new(runner.clone(), Path::new("/bin"), params());
            init.initialize(&serde_yaml::Value::Null).await.unwrap();
            assert!(runner.commands().is_empty());
        });
    }

    #[test]
    fn spec_wires_database_sync_and_bootstrap() {
        let spec = spec();
        assert_eq!(spec.database.as_deref(), Some(DB_NAME));
        assert_eq!(spec.sync_command[2], "db_sync");
        assert_eq!(spec.initializer.as_deref(), Some(SERVICE_NAME));
        assert_eq!(spec.bootstrap.as_deref(), Some(BOOTSTRAP_FN));
        assert!(spec.packages.iter().any(|p| !p.removable));
    }
}
