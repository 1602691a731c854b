//! Runtime environment: the executor directory tree and the Python venv inside it.
//!
//! Callers (the orchestrator, CLI commands) get a [`PackageEnvironment`]; the
//! concrete [`EnvironmentManager`] is the only thing that touches pip.

pub mod error;
pub mod layout;
pub mod manager;

use std::path::Path;

pub use error::EnvError;
pub use layout::ExecutorLayout;
pub use manager::{EnvironmentManager, PythonEnv};

/// Operations the orchestrator needs from an isolated package environment.
pub trait PackageEnvironment: Send + Sync {
    /// Interpreter inside the environment.
    fn runner_path(&self) -> &Path;

    /// The subsequence of `packages` that is not installed.
    fn check_installed(&self, packages: &[String]) -> Result<Vec<String>, EnvError>;

    /// Install `packages` in one batch.
    fn install(&self, packages: &[String]) -> Result<(), EnvError>;
}
