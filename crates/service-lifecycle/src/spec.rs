//! Service and stack descriptions

use std::path::Path;

use pkg_manager::Package;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Everything the engine needs to know about one service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name
    pub name: String,

    /// Host packages this service needs
    #[serde(default)]
    pub packages: Vec<Package>,

    /// Config artifact names to render and write
    #[serde(default)]
    pub configs: Vec<String>,

    /// Dedicated database, dropped and recreated at install time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Schema-sync command template; tokens may carry `%NAME%` placeholders
    #[serde(default)]
    pub sync_command: Vec<String>,

    /// The long-running process to start, if the service has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppSpec>,

    /// Names of services that must be driven before this one
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Id of the late-bound post-start initializer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<String>,

    /// Bootstrap descriptor file under the service's template directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<String>,
}

/// A service's launchable process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSpec {
    /// Binary path template; may carry `%NAME%` placeholders
    pub binary: String,
    /// Argument templates
    #[serde(default)]
    pub args: Vec<String>,
}

/// The set of services one deployment run drives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackPlan {
    /// Service specs in declaration order
    pub services: Vec<ServiceSpec>,
}

impl StackPlan {
    /// Load a plan from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// The built-in plan: just the identity service
    pub fn builtin() -> Self {
        Self {
            services: vec![crate::identity::spec()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_service() {
        let yaml = "\
services:
  - name: gateway
    packages:
      - name: nginx
    configs: [gateway.conf]
    dependencies: [identity]
";
        let plan: StackPlan = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(plan.services.len(), 1);
        let svc = &plan.services[0];
        assert_eq!(svc.name, "gateway");
        assert_eq!(svc.packages[0].name, "nginx");
        assert_eq!(svc.dependencies, ["identity"]);
        assert!(svc.database.is_none());
        assert!(svc.app.is_none());
    }

    #[test]
    fn builtin_plan_contains_identity() {
        let plan = StackPlan::builtin();
        assert_eq!(plan.services[0].name, crate::identity::SERVICE_NAME);
    }
}
