//! Unified configuration layer.
//!
//! Every environment variable read goes through this module; callers use the
//! structured configs instead of `std::env::var`.
//!
//! - `loader`: env_or, env_optional, env_bool, env_u64, `.env` loading
//! - `schema`: ExecutorConfig, ObservabilityConfig
//! - `env_keys`: key constants and aliases

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_u64, load_dotenv};
pub use schema::{
    ExecutorConfig, ObservabilityConfig, DEFAULT_EXECUTOR_NAME, DEFAULT_EXEC_TIMEOUT_SECS,
    DEFAULT_PIP_TIMEOUT_SECS, DEFAULT_VENV_NAME,
};
