//! Deployment-wide shared parameters
//!
//! A pure function of the deployment configuration: identity lists,
//! generated secrets, and the endpoint triples every service and config
//! template agrees on. Callers needing stability across multiple reads
//! within one run compute once and reuse the result.

use std::collections::HashMap;

use serde::Serialize;

use crate::{DeploymentConfig, Result, SecretStore};

/// Default administrative endpoint port
pub const DEFAULT_AUTH_PORT: u16 = 35357;
/// Default public endpoint port
pub const DEFAULT_SERVICE_PORT: u16 = 5000;

const DEFAULT_PROTOCOL: &str = "http";
const API_PATH: &str = "v2.0";

const SECRET_LENGTH: usize = 8;
const ADMIN_PASSWORD_LENGTH: usize = 20;

/// One endpoint role: scheme, address, and the combined URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Full URI for clients
    pub uri: String,
    /// Port
    pub port: u16,
    /// Protocol scheme
    pub protocol: String,
    /// Host address
    pub host: String,
}

impl Endpoint {
    fn new(protocol: String, host: String, port: u16) -> Self {
        let uri = make_url(&protocol, &host, port, API_PATH);
        Self {
            uri,
            port,
            protocol,
            host,
        }
    }
}

/// The three endpoint roles.
///
/// `internal` is a value copy of `public` taken at computation time, not
/// an alias: mutating one afterwards never affects the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    /// Administrative endpoint
    pub admin: Endpoint,
    /// Public endpoint
    pub public: Endpoint,
    /// Internal endpoint
    pub internal: Endpoint,
}

/// The shared parameter map consumed by config and command templating
#[derive(Debug, Clone, Serialize)]
pub struct SharedParams {
    /// All tenant names
    pub tenants: Vec<String>,
    /// All user names
    pub users: Vec<String>,
    /// Administrative tenant
    pub admin_tenant: String,
    /// Administrative user
    pub admin_user: String,
    /// Demonstration tenant
    pub demo_tenant: String,
    /// Demonstration user
    pub demo_user: String,
    /// Tenant owning service accounts
    pub service_tenant: String,
    /// Service-specific user, when one was supplied
    pub service_user: Option<String>,
    /// Administrative bootstrap token
    pub service_token: String,
    /// Administrator password
    pub admin_password: String,
    /// Service account password
    pub service_password: String,
    /// Endpoint roles
    pub endpoints: Endpoints,
}

fn make_url(protocol: &str, host: &str, port: u16, path: &str) -> String {
    format!("{protocol}://{host}:{port}/{path}")
}

/// Compute the shared parameter map for one deployment run.
///
/// No caching happens here; every call recomputes from the configuration
/// and the secret store.
pub fn compute_shared_params(
    cfg: &DeploymentConfig,
    service_user: Option<&str>,
    secrets: &dyn SecretStore,
) -> Result<SharedParams> {
    let tenants = vec![
        "admin".to_string(),
        "service".to_string(),
        "demo".to_string(),
    ];
    let mut users = vec!["admin".to_string(), "demo".to_string()];
    if let Some(user) = service_user {
        users.push(user.to_string());
    }

    let service_token =
        secrets.get_or_create("service_token", "the service admin token", SECRET_LENGTH)?;
    let admin_password = secrets.get_or_create(
        "admin_password",
        "the dashboard and identity admin",
        ADMIN_PASSWORD_LENGTH,
    )?;
    let service_password =
        secrets.get_or_create("service_password", "service authentication", SECRET_LENGTH)?;

    let overrides = &cfg.endpoints;
    let admin = Endpoint::new(
        overrides
            .auth_protocol
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
        overrides
            .auth_host
            .clone()
            .unwrap_or_else(|| cfg.host_ip.clone()),
        overrides.auth_port.unwrap_or(DEFAULT_AUTH_PORT),
    );
    let public = Endpoint::new(
        overrides
            .service_protocol
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
        overrides
            .service_host
            .clone()
            .unwrap_or_else(|| cfg.host_ip.clone()),
        overrides.service_port.unwrap_or(DEFAULT_SERVICE_PORT),
    );
    let internal = public.clone();

    Ok(SharedParams {
        tenants,
        users,
        admin_tenant: "admin".to_string(),
        admin_user: "admin".to_string(),
        demo_tenant: "demo".to_string(),
        demo_user: "demo".to_string(),
        service_tenant: "service".to_string(),
        service_user: service_user.map(str::to_string),
        service_token,
        admin_password,
        service_password,
        endpoints: Endpoints {
            admin,
            public,
            internal,
        },
    })
}

impl SharedParams {
    /// Flatten into the `%NAME%` substitution map used by templates
    pub fn to_param_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("tenants".to_string(), self.tenants.join(","));
        map.insert("users".to_string(), self.users.join(","));
        map.insert("admin_tenant".to_string(), self.admin_tenant.clone());
        map.insert("admin_user".to_string(), self.admin_user.clone());
        map.insert("demo_tenant".to_string(), self.demo_tenant.clone());
        map.insert("demo_user".to_string(), self.demo_user.clone());
        map.insert("service_tenant".to_string(), self.service_tenant.clone());
        if let Some(user) = &self.service_user {
            map.insert("service_user".to_string(), user.clone());
        }
        map.insert("service_token".to_string(), self.service_token.clone());
        map.insert("admin_password".to_string(), self.admin_password.clone());
        map.insert(
            "service_password".to_string(),
            self.service_password.clone(),
        );
        for (role, endpoint) in [
            ("admin", &self.endpoints.admin),
            ("public", &self.endpoints.public),
            ("internal", &self.endpoints.internal),
        ] {
            map.insert(format!("endpoints.{role}.uri"), endpoint.uri.clone());
            map.insert(format!("endpoints.{role}.port"), endpoint.port.to_string());
            map.insert(
                format!("endpoints.{role}.protocol"),
                endpoint.protocol.clone(),
            );
            map.insert(format!("endpoints.{role}.host"), endpoint.host.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySecretStore;

    fn config(yaml: &str) -> DeploymentConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn defaults_endpoints_from_host_ip() {
        let cfg = config("host_ip: 192.168.1.20\ndistro: debian\n");
        let params = compute_shared_params(&cfg, None, &MemorySecretStore::new()).unwrap();
        assert_eq!(params.endpoints.admin.host, "192.168.1.20");
        assert_eq!(params.endpoints.admin.port, DEFAULT_AUTH_PORT);
        assert_eq!(params.endpoints.public.port, DEFAULT_SERVICE_PORT);
        assert_eq!(
            params.endpoints.public.uri,
            "http://192.168.1.20:5000/v2.0"
        );
    }

    #[test]
    fn internal_is_a_value_copy_of_public() {
        let cfg = config("host_ip: 10.0.0.1\ndistro: debian\n");
        let mut params = compute_shared_params(&cfg, None, &MemorySecretStore::new()).unwrap();
        assert_eq!(params.endpoints.internal, params.endpoints.public);

        params.endpoints.public.port = 9999;
        params.endpoints.public.host = "elsewhere".to_string();
        assert_eq!(params.endpoints.internal.port, DEFAULT_SERVICE_PORT);
        assert_eq!(params.endpoints.internal.host, "10.0.0.1");
    }

    #[test]
    fn service_user_extends_user_list() {
        let cfg = config("host_ip: 10.0.0.1\ndistro: debian\n");
        let params =
            compute_shared_params(&cfg, Some("identity"), &MemorySecretStore::new()).unwrap();
        assert_eq!(params.users, ["admin", "demo", "identity"]);
        assert_eq!(params.service_user.as_deref(), Some("identity"));

        let without = compute_shared_params(&cfg, None, &MemorySecretStore::new()).unwrap();
        assert_eq!(without.users, ["admin", "demo"]);
    }

    #[test]
    fn secrets_come_from_the_store_with_requested_lengths() {
        let cfg = config("host_ip: 10.0.0.1\ndistro: debian\n");
        let store = MemorySecretStore::new();
        let params = compute_shared_params(&cfg, None, &store).unwrap();
        assert_eq!(params.service_token.len(), 8);
        assert_eq!(params.admin_password.len(), 20);

        // Same store, same secrets on recompute
        let again = compute_shared_params(&cfg, None, &store).unwrap();
        assert_eq!(again.service_token, params.service_token);
    }

    #[test]
    fn param_map_flattens_endpoints() {
        let cfg = config("host_ip: 10.0.0.1\ndistro: debian\n");
        let params = compute_shared_params(&cfg, None, &MemorySecretStore::new()).unwrap();
        let map = params.to_param_map();
        assert_eq!(
            map.get("endpoints.admin.port").map(String::as_str),
            Some("35357")
        );
        assert_eq!(
            map.get("endpoints.internal.host").map(String::as_str),
            Some("10.0.0.1")
        );
        assert_eq!(map.get("service_token"), Some(&params.service_token));
    }
}
