//! # Service Lifecycle
//!
//! Drives each platform service through its lifecycle:
//!
//! ```text
//! NotInstalled -> Installed -> Configured -> Started -> Initialized
//! ```
//!
//! Transitions are driven externally by the [`Orchestrator`], one service
//! at a time in dependency order, except the final one: `Started ->
//! Initialized` is gated internally by an on-disk trace marker so that
//! first-run initialization happens exactly once across repeated runs.

#![warn(missing_docs)]

mod database;
pub mod identity;
mod initializer;
mod lifecycle;
mod orchestrator;
mod spec;
mod state;

pub use database::DbAdmin;
pub use initializer::{Initializer, InitializerRegistry};
pub use lifecycle::{EngineContext, Lifecycle, ServiceDirs};
pub use orchestrator::{DependencyGraph, Orchestrator};
pub use spec::{AppSpec, ServiceSpec, StackPlan};
pub use state::ServiceState;

/// Error types for lifecycle operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Command execution error
    #[error(transparent)]
    Command(#[from] command_runner::Error),

    /// Package operation error
    #[error(transparent)]
    Package(#[from] pkg_manager::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] stackup_config::ConfigError),

    /// Bootstrap descriptor could not be parsed
    #[error("invalid bootstrap descriptor: {0}")]
    Bootstrap(#[from] serde_yaml::Error),

    /// First-run initialization failed; the trace marker is not written
    /// and the next run retries from scratch
    #[error("initialization of `{service}` failed: {reason}")]
    Initialization {
        /// Service being initialized
        service: String,
        /// What went wrong
        reason: String,
    },

    /// No initializer registered under the requested id
    #[error("no initializer registered for `{0}`")]
    UnknownInitializer(String),

    /// A dependency or operation referenced an unknown service
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// The service dependency graph has a cycle
    #[error("circular dependency among services")]
    CircularDependency,

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
