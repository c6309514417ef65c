//! Lifecycle states

use std::fmt;

use serde::Serialize;

/// Where a service currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceState {
    /// Nothing has been done yet
    NotInstalled,
    /// Packages are installed and the database is prepared
    Installed,
    /// Config artifacts are written
    Configured,
    /// The service process is running
    Started,
    /// First-run initialization has completed
    Initialized,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceState::NotInstalled => "not installed",
            ServiceState::Installed => "installed",
            ServiceState::Configured => "configured",
            ServiceState::Started => "started",
            ServiceState::Initialized => "initialized",
        };
        f.write_str(label)
    }
}
