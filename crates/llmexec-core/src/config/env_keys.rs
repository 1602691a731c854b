//! Environment variable key constants.
//!
//! Primary variables use the `LLMEXEC_*` prefix.

/// Executor location and environment naming
pub mod paths {
    pub const LLMEXEC_BASE_DIR: &str = "LLMEXEC_BASE_DIR";
    pub const LLMEXEC_NAME: &str = "LLMEXEC_NAME";
    pub const LLMEXEC_VENV_NAME: &str = "LLMEXEC_VENV_NAME";
    pub const VENV_NAME_ALIASES: &[&str] = &["LLMEXEC_ENV_NAME"];
}

/// Time budgets
pub mod limits {
    /// Shared by `pip show` and `pip install`.
    pub const LLMEXEC_PIP_TIMEOUT_SECS: &str = "LLMEXEC_PIP_TIMEOUT_SECS";
    pub const PIP_TIMEOUT_ALIASES: &[&str] = &["LLMEXEC_TIMEOUT_SECS"];

    pub const LLMEXEC_EXEC_TIMEOUT_SECS: &str = "LLMEXEC_EXEC_TIMEOUT_SECS";
}

/// Observability and logs
pub mod observability {
    pub const LLMEXEC_QUIET: &str = "LLMEXEC_QUIET";

    pub const LLMEXEC_LOG_LEVEL: &str = "LLMEXEC_LOG_LEVEL";

    pub const LLMEXEC_LOG_JSON: &str = "LLMEXEC_LOG_JSON";

    /// Per-executor `logs/runs.jsonl`.
    pub const LLMEXEC_WRITE_LOGS: &str = "LLMEXEC_WRITE_LOGS";
}
