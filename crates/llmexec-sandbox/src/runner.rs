//! Execution collaborator: run a Python snippet with the environment interpreter.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use thiserror::Error;

use llmexec_core::config::DEFAULT_EXEC_TIMEOUT_SECS;

use crate::common::run_with_timeout;

/// Captured output of a finished snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Errors returned by snippet execution.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Code exited with code {exit_code}\n{stderr}")]
    Failed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Code execution timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Failed to start {}: {source}", runner.display())]
    Spawn {
        runner: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write the snippet to a temporary file: {0}")]
    Script(#[source] io::Error),
}

/// Runs snippets to completion and returns their captured output.
pub trait CodeRunner: Send + Sync {
    fn execute(&self, runner: &Path, code: &str, working_dir: &Path) -> Result<ExecutionOutput, RunError>;
}

/// Default [`CodeRunner`]: a temporary `.py` file run by the environment interpreter.
#[derive(Debug, Clone, Copy)]
pub struct PythonRunner {
    pub timeout_secs: u64,
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_EXEC_TIMEOUT_SECS,
        }
    }
}

impl CodeRunner for PythonRunner {
    fn execute(&self, runner: &Path, code: &str, working_dir: &Path) -> Result<ExecutionOutput, RunError> {
        execute_code(runner, code, working_dir, self.timeout_secs)
    }
}

/// Write `code` to a temporary file and run it with `runner` in `working_dir`.
///
/// A non-zero exit is [`RunError::Failed`] carrying stderr; exceeding
/// `timeout_secs` kills the process.
pub fn execute_code(
    runner: &Path,
    code: &str,
    working_dir: &Path,
    timeout_secs: u64,
) -> Result<ExecutionOutput, RunError> {
    let mut file = tempfile::Builder::new()
        .prefix("llmexec_")
        .suffix(".py")
        .tempfile()
        .map_err(RunError::Script)?;
    file.write_all(code.as_bytes()).map_err(RunError::Script)?;
    file.flush().map_err(RunError::Script)?;
    // Close our handle before the interpreter opens the file (Windows locks it).
    let script = file.into_temp_path();

    let start = Instant::now();
    let mut cmd = Command::new(runner);
    cmd.arg(&script)
        .current_dir(working_dir)
        .env("PYTHONIOENCODING", "utf-8")
        .env("PYTHONUNBUFFERED", "1");
    let out = run_with_timeout(&mut cmd, Duration::from_secs(timeout_secs)).map_err(|source| {
        RunError::Spawn {
            runner: runner.to_path_buf(),
            source,
        }
    })?;
    tracing::debug!(
        "Snippet finished in {:?} (exit {}, timed_out {})",
        start.elapsed(),
        out.exit_code,
        out.timed_out
    );

    if out.timed_out {
        return Err(RunError::Timeout { secs: timeout_secs });
    }
    if out.exit_code != 0 {
        return Err(RunError::Failed {
            exit_code: out.exit_code,
            stdout: out.stdout,
            stderr: out.stderr,
        });
    }
    Ok(ExecutionOutput {
        stdout: out.stdout,
        stderr: out.stderr,
        exit_code: out.exit_code,
    })
}
