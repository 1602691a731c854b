//! Default wiring: config → executor tree → environment → orchestrator.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use llmexec_core::config::ExecutorConfig;
use llmexec_sandbox::env::manager::validate_name;
use llmexec_sandbox::env::{EnvError, EnvironmentManager, ExecutorLayout};
use llmexec_sandbox::runner::PythonRunner;
use llmexec_sandbox::stdlib::ScriptClassifier;

use crate::observability::RunLog;
use crate::orchestrator::ExecutionOrchestrator;

/// Entry point for building executors from an [`ExecutorConfig`].
pub struct Executor;

impl Executor {
    /// Validate `config`, materialize `base_dir/name` and its environment, and
    /// return an orchestrator bound to them.
    pub fn open(config: &ExecutorConfig) -> Result<ExecutionOrchestrator> {
        let (layout, manager) = Self::open_environment(config)?;
        let classifier = ScriptClassifier::new(
            layout.standard_pkg_script(),
            layout.base_dir(),
            Duration::from_secs(config.pip_timeout_secs),
        );
        let runner = PythonRunner {
            timeout_secs: config.exec_timeout_secs,
        };

        let mut orchestrator = ExecutionOrchestrator::new(
            Box::new(manager),
            Box::new(classifier),
            Box::new(runner),
            layout.base_dir(),
        );
        if config.write_logs {
            orchestrator = orchestrator.with_run_log(RunLog::new(layout.run_log()));
        }
        Ok(orchestrator)
    }

    /// Only the executor tree and its environment, for package management
    /// without running anything.
    pub fn open_environment(config: &ExecutorConfig) -> Result<(ExecutorLayout, EnvironmentManager)> {
        validate(config)?;
        let layout = ExecutorLayout::ensure(&config.base_dir, &config.name)?;
        let manager = EnvironmentManager::new(&config.venv_name, layout.root(), config.pip_timeout_secs)
            .with_context(|| format!("Open environment in {}", layout.root().display()))?;
        tracing::debug!("Executor ready at {}", layout.root().display());
        Ok((layout, manager))
    }
}

/// Reject bad configuration before anything touches the disk.
fn validate(config: &ExecutorConfig) -> Result<(), EnvError> {
    if !config.base_dir.is_dir() {
        return Err(EnvError::Configuration(format!(
            "base directory {} does not exist or is not a directory",
            config.base_dir.display()
        )));
    }
    validate_name(Path::new(&config.name))?;
    validate_name(Path::new(&config.venv_name))?;
    if config.pip_timeout_secs < 1 || config.exec_timeout_secs < 1 {
        return Err(EnvError::Configuration(
            "timeouts must be at least 1 second".to_string(),
        ));
    }
    Ok(())
}
