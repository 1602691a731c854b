use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the environment lifecycle and pip reconciliation.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Invalid constructor arguments. Fatal, never retried.
    #[error("Invalid environment configuration: {0}")]
    Configuration(String),

    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    /// pip exited unsuccessfully. Output is kept verbatim for diagnosis.
    #[error("pip reported a failure\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    Installation { stdout: String, stderr: String },

    #[error("Failed to create virtual environment at {}: {reason}", path.display())]
    Venv { path: PathBuf, reason: String },

    #[error("Failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
