//! Deployment configuration file model

use std::path::{Path, PathBuf};

use pkg_manager::DistroFamily;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Root deployment configuration, loaded from a YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Base host address used to default every endpoint host
    pub host_ip: String,

    /// Distribution family of this host
    pub distro: DistroFamily,

    /// Warm-up seconds between starting a service and initializing it
    #[serde(default = "default_wait_seconds")]
    pub service_wait_seconds: u64,

    /// When true, remove operations leave host packages in place
    #[serde(default)]
    pub keep_packages: bool,

    /// The pip executable used to list the Python environment
    #[serde(default = "default_pip_tool")]
    pub pip_tool: String,

    /// Installation directory roots
    #[serde(default)]
    pub dirs: InstallDirs,

    /// Endpoint role overrides
    #[serde(default)]
    pub endpoints: EndpointSettings,

    /// Database administrator settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Where generated secrets are persisted; defaults under the state dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_file: Option<PathBuf>,
}

fn default_wait_seconds() -> u64 {
    5
}

fn default_pip_tool() -> String {
    "pip3".to_string()
}

impl DeploymentConfig {
    /// Load and parse a deployment file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Directory roots for installed services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallDirs {
    /// Root of per-service application directories
    pub app_root: PathBuf,
    /// Root of per-service rendered config directories
    pub config_root: PathBuf,
    /// Root of per-service trace marker directories
    pub trace_root: PathBuf,
}

impl Default for InstallDirs {
    fn default() -> Self {
        Self {
            app_root: PathBuf::from("/opt/stackup"),
            config_root: PathBuf::from("/etc/stackup"),
            trace_root: PathBuf::from("/var/lib/stackup/trace"),
        }
    }
}

/// Overrides for the administrative and public endpoint roles.
///
/// Every field defaults at parameter-computation time: hosts to the base
/// host address, ports to the fixed role defaults, protocols to plain
/// HTTP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Administrative endpoint host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_host: Option<String>,
    /// Administrative endpoint port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_port: Option<u16>,
    /// Administrative endpoint protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_protocol: Option<String>,
    /// Public endpoint host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_host: Option<String>,
    /// Public endpoint port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u16>,
    /// Public endpoint protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_protocol: Option<String>,
}

/// Database administrator connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Administrator account
    #[serde(default = "default_db_user")]
    pub user: String,
    /// Database host
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Database port
    #[serde(default = "default_db_port")]
    pub port: u16,
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            user: default_db_user(),
            host: default_db_host(),
            port: default_db_port(),
        }
    }
}
