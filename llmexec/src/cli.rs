use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use llmexec_core::config::ExecutorConfig;

/// llmexec - run the Python program embedded in LLM output, installing what it needs
#[derive(Parser, Debug)]
#[command(name = "llmexec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub executor: ExecutorArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for `LLMEXEC_*` environment configuration.
#[derive(Args, Debug, Default)]
pub struct ExecutorArgs {
    /// Directory that holds the executor tree (default: from env or ".")
    #[arg(long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Executor directory name (default: from env or "local_executor")
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Virtual environment directory name (default: from env or ".venv")
    #[arg(long, global = true)]
    pub venv_name: Option<String>,

    /// pip show / pip install timeout in seconds (default: from env or 60)
    #[arg(long, global = true, value_name = "SECS")]
    pub pip_timeout: Option<u64>,

    /// Snippet execution timeout in seconds (default: from env or 30)
    #[arg(long, global = true, value_name = "SECS")]
    pub exec_timeout: Option<u64>,

    /// Do not write logs/runs.jsonl
    #[arg(long, global = true, default_value = "false")]
    pub no_logs: bool,
}

impl ExecutorArgs {
    /// Environment config with CLI overrides applied.
    pub fn to_config(&self) -> ExecutorConfig {
        let mut config = ExecutorConfig::from_env();
        if let Some(dir) = &self.base_dir {
            config.base_dir = dir.clone();
        }
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(venv) = &self.venv_name {
            config.venv_name = venv.clone();
        }
        if let Some(secs) = self.pip_timeout {
            config.pip_timeout_secs = secs;
        }
        if let Some(secs) = self.exec_timeout {
            config.exec_timeout_secs = secs;
        }
        if self.no_logs {
            config.write_logs = false;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the Python program found in the text and print its output
    Run {
        /// File with LLM output. Use "-" or omit to read stdin
        #[arg(value_name = "FILE")]
        input: Option<String>,
    },

    /// Show the dependencies that would be installed, without touching any environment
    Deps {
        /// File with LLM output. Use "-" or omit to read stdin
        #[arg(value_name = "FILE")]
        input: Option<String>,
    },

    /// Print the packages missing from the environment
    Check {
        #[arg(value_name = "PKG", required = true)]
        packages: Vec<String>,
    },

    /// Install packages into the environment
    Install {
        #[arg(value_name = "PKG", required = true)]
        packages: Vec<String>,
    },

    /// Print the environment record as JSON
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::parse_from([
            "llmexec",
            "run",
            "answer.md",
            "--base-dir",
            "/tmp/x",
            "--exec-timeout",
            "5",
            "--no-logs",
        ]);
        let config = cli.executor.to_config();
        assert_eq!(config.base_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.exec_timeout_secs, 5);
        assert!(!config.write_logs);
        match cli.command {
            Commands::Run { input } => assert_eq!(input.as_deref(), Some("answer.md")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_check_requires_packages() {
        assert!(Cli::try_parse_from(["llmexec", "check"]).is_err());
        let cli = Cli::parse_from(["llmexec", "install", "rich", "httpx"]);
        assert!(matches!(cli.command, Commands::Install { packages } if packages == ["rich", "httpx"]));
    }
}
