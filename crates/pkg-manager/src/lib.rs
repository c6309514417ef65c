//! # Package Manager
//!
//! Uniform install/remove operations over heterogeneous distribution
//! package managers, plus a queryable cache of what is installed in the
//! deployment's Python environment.
//!
//! The [`PackageManager`] trait is the capability set the lifecycle engine
//! programs against; [`AptManager`] and [`DnfManager`] translate it into
//! Debian-family and RedHat-family command invocations. The
//! [`InstalledCache`] answers version-satisfaction queries from a memoized
//! listing snapshot and is invalidated explicitly by whoever mutates
//! package state — the adapters never touch it themselves, so call sites
//! can batch several installs before paying for one recomputation.

#![warn(missing_docs)]

mod adapter;
mod apt;
mod cache;
mod dnf;
mod package;

pub use adapter::{for_family, format_package, DistroFamily, PackageManager};
pub use apt::AptManager;
pub use cache::InstalledCache;
pub use dnf::DnfManager;
pub use package::Package;

/// Error type for package operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying command execution failed
    #[error(transparent)]
    Command(#[from] command_runner::Error),

    /// A package descriptor had an empty name
    #[error("package name may not be empty")]
    EmptyName,

    /// A version string in a cache query could not be parsed
    #[error("invalid version `{version}`: {reason}")]
    InvalidVersion {
        /// The offending version string
        version: String,
        /// Parser diagnostic
        reason: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
