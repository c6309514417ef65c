//! # Stackup Configuration
//!
//! Everything the installer knows about a deployment that is not code:
//! the deployment YAML file, the tolerant INI document model used by
//! config adjustment routines, the template transformation pipeline
//! (load, adjust, substitute), the deployment-wide shared parameter map,
//! and the secret store behind it.

#![warn(missing_docs)]

mod deployment;
mod ini;
mod params;
mod secrets;
mod transform;

pub use deployment::{DatabaseSettings, DeploymentConfig, EndpointSettings, InstallDirs};
pub use ini::IniDocument;
pub use params::{
    compute_shared_params, Endpoint, Endpoints, SharedParams, DEFAULT_AUTH_PORT,
    DEFAULT_SERVICE_PORT,
};
pub use secrets::{FileSecretStore, MemorySecretStore, SecretStore};
pub use transform::{substitute_placeholders, Transformer};

use std::path::PathBuf;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that failed
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A config placeholder had no value in the parameter map
    #[error("no value for placeholder(s) {placeholders} in config `{config}`")]
    UnresolvedPlaceholder {
        /// The placeholder names that had no value
        placeholders: String,
        /// The config being rendered
        config: String,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
