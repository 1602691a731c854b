//! Configuration structs grouped by concern, loaded from environment variables.

use super::env_keys::{limits, observability as obv_keys, paths};
use super::loader::{env_bool, env_or, env_u64};
use std::path::PathBuf;

/// Default executor directory name under the base directory.
pub const DEFAULT_EXECUTOR_NAME: &str = "local_executor";
/// Default virtual environment directory name inside the executor directory.
pub const DEFAULT_VENV_NAME: &str = ".venv";
/// Default budget for `pip show` / `pip install`, in seconds.
pub const DEFAULT_PIP_TIMEOUT_SECS: u64 = 60;
/// Default budget for running a snippet, in seconds.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;

/// Where the executor lives and how long its subprocesses may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Directory that holds the executor tree. Must already exist.
    pub base_dir: PathBuf,
    /// Executor directory name (`base_dir/name`).
    pub name: String,
    /// Virtual environment directory name inside the executor directory.
    pub venv_name: String,
    pub pip_timeout_secs: u64,
    pub exec_timeout_secs: u64,
    /// Append one JSONL record per run to `base_dir/name/logs/runs.jsonl`.
    pub write_logs: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            name: DEFAULT_EXECUTOR_NAME.to_string(),
            venv_name: DEFAULT_VENV_NAME.to_string(),
            pip_timeout_secs: DEFAULT_PIP_TIMEOUT_SECS,
            exec_timeout_secs: DEFAULT_EXEC_TIMEOUT_SECS,
            write_logs: true,
        }
    }
}

impl ExecutorConfig {
    /// Load from environment variables (reads `.env` once). Unset values use defaults.
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            base_dir: PathBuf::from(env_or(paths::LLMEXEC_BASE_DIR, &[], || ".".to_string())),
            name: env_or(paths::LLMEXEC_NAME, &[], || DEFAULT_EXECUTOR_NAME.to_string()),
            venv_name: env_or(paths::LLMEXEC_VENV_NAME, paths::VENV_NAME_ALIASES, || {
                DEFAULT_VENV_NAME.to_string()
            }),
            pip_timeout_secs: env_u64(
                limits::LLMEXEC_PIP_TIMEOUT_SECS,
                limits::PIP_TIMEOUT_ALIASES,
                DEFAULT_PIP_TIMEOUT_SECS,
            ),
            exec_timeout_secs: env_u64(
                limits::LLMEXEC_EXEC_TIMEOUT_SECS,
                &[],
                DEFAULT_EXEC_TIMEOUT_SECS,
            ),
            write_logs: env_bool(obv_keys::LLMEXEC_WRITE_LOGS, &[], true),
        }
    }

    /// Path of the executor directory (`base_dir/name`).
    pub fn executor_dir(&self) -> PathBuf {
        self.base_dir.join(&self.name)
    }
}

/// Observability settings: quiet, log_level, log_json
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::LLMEXEC_QUIET, &[], false),
                log_level: env_or(obv_keys::LLMEXEC_LOG_LEVEL, &[], || {
                    "llmexec=info,llmexec_sandbox=info,llmexec_core=info".to_string()
                }),
                log_json: env_bool(obv_keys::LLMEXEC_LOG_JSON, &[], false),
            }
        })
    }
}
